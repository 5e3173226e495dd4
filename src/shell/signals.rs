use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, warn};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal};

/// Set by the SIGCHLD handler, cleared by whoever drains child events.
static CHILD_EVENT: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigchld(_: libc::c_int) {
    CHILD_EVENT.store(true, Ordering::SeqCst);
}

/// Installs the SIGCHLD handler. The handler only raises a flag; job
/// bookkeeping happens in the main loop via [`take_child_event`].
pub fn setup_sigchld_handler() -> nix::Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_sigchld),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );
    // SAFETY: the handler touches nothing but an atomic.
    unsafe { signal::sigaction(Signal::SIGCHLD, &action) }?;
    debug!("SIGCHLD handler installed");
    Ok(())
}

/// Returns whether a child changed state since the last call.
pub fn take_child_event() -> bool {
    CHILD_EVENT.swap(false, Ordering::SeqCst)
}

fn sigchld_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGCHLD);
    set
}

/// Keeps SIGCHLD blocked for the calling thread until dropped, restoring the
/// previous mask.
pub struct SigchldBlock {
    previous: SigSet,
}

impl SigchldBlock {
    pub fn new() -> nix::Result<Self> {
        let mut previous = SigSet::empty();
        signal::sigprocmask(
            SigmaskHow::SIG_BLOCK,
            Some(&sigchld_set()),
            Some(&mut previous),
        )?;
        Ok(Self { previous })
    }
}

impl Drop for SigchldBlock {
    fn drop(&mut self) {
        if let Err(e) = signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&self.previous), None) {
            warn!("failed to restore signal mask: {}", e);
        }
    }
}

struct InterruptState {
    depth: usize,
    previous: Option<SigAction>,
}

/// Set in a background job's child, which leads its own process group and
/// leaves SIGINT at its default.
static IN_JOB_CHILD: AtomicBool = AtomicBool::new(false);

static INTERRUPT: Mutex<InterruptState> = Mutex::new(InterruptState {
    depth: 0,
    previous: None,
});

fn interrupt_state() -> MutexGuard<'static, InterruptState> {
    INTERRUPT.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ignores SIGINT in the interpreter while a foreground child runs, so Ctrl-C
/// reaches the child only. Guards nest: the first one saves the disposition
/// and the last one dropped puts it back, whatever order they drop in.
pub struct InterruptGuard {
    counted: bool,
}

impl InterruptGuard {
    pub fn ignore() -> nix::Result<Self> {
        if IN_JOB_CHILD.load(Ordering::SeqCst) {
            return Ok(Self { counted: false });
        }
        let mut state = interrupt_state();
        if state.depth == 0 {
            let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
            // SAFETY: installing SIG_IGN runs no code in signal context.
            let previous = unsafe { signal::sigaction(Signal::SIGINT, &ignore) }?;
            state.previous = Some(previous);
        }
        state.depth += 1;
        Ok(Self { counted: true })
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if !self.counted {
            return;
        }
        let mut state = interrupt_state();
        state.depth = state.depth.saturating_sub(1);
        if state.depth > 0 {
            return;
        }
        if let Some(previous) = state.previous.take() {
            // SAFETY: restores the action that was installed before the first guard.
            if let Err(e) = unsafe { signal::sigaction(Signal::SIGINT, &previous) } {
                warn!("failed to restore SIGINT handler: {}", e);
            }
        }
    }
}

/// Marks this process as a background job's child. Called right after fork,
/// before anything could take the interrupt lock.
pub fn enter_job_child() {
    IN_JOB_CHILD.store(true, Ordering::SeqCst);
}

/// Runs in a freshly forked child before exec: default dispositions for the
/// signals the interpreter touches and an empty mask, since both survive exec.
pub fn reset_for_child() {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    for sig in [Signal::SIGINT, Signal::SIGQUIT, Signal::SIGCHLD] {
        // SAFETY: SIG_DFL runs no code in signal context.
        let _ = unsafe { signal::sigaction(sig, &default) };
    }
    let _ = signal::sigprocmask(SigmaskHow::SIG_SETMASK, Some(&SigSet::empty()), None);
}
