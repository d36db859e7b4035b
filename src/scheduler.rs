use std::time::Duration;

use log::trace;
use tokio::{task, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{NetErr, Result};

/// The per-iteration work driven by a `CooperativeLoop`, together with whatever state it
/// needs to carry between iterations.
pub trait LoopBody {
    /// The value the loop resolves with.
    type Output;

    /// Runs iteration `index`. An error stops the loop, `finish` is not called.
    fn step(&mut self, index: usize) -> Result<()>;

    /// Called once after the last iteration.
    fn finish(self) -> Self::Output;
}

/// Runs a bounded loop on the current task, handing control back to the runtime between
/// iterations whenever it has been running for longer than `min_yield_interval`.
///
/// Iterations are never interrupted, suspension only happens between two of them.
#[derive(Debug, Clone)]
pub struct CooperativeLoop {
    min_yield_interval: Duration,
    cancel: Option<CancellationToken>,
}

impl CooperativeLoop {
    /// Creates a new `CooperativeLoop`.
    ///
    /// # Arguments
    /// * `min_yield_interval` - How long the loop may run uninterrupted before yielding.
    pub fn new(min_yield_interval: Duration) -> Self {
        Self {
            min_yield_interval,
            cancel: None,
        }
    }

    /// Makes the loop check `token` every time it yields, failing with `Cancelled` once
    /// the token is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Calls `body.step(i)` for every `i` in `0..size` in increasing order, then resolves
    /// with `body.finish()`.
    ///
    /// # Arguments
    /// * `size` - The amount of iterations.
    /// * `body` - The loop's work and state.
    ///
    /// # Errors
    /// * `InvalidArgument` if `size` is negative, before any iteration runs.
    /// * `Cancelled` if the cancellation token fired, observed at a yield point.
    /// * Any error returned by `body.step`.
    pub async fn run<B: LoopBody>(&self, size: i64, mut body: B) -> Result<B::Output> {
        let size = usize::try_from(size).map_err(|_| {
            NetErr::InvalidArgument(format!("a loop of length {size} is not valid"))
        })?;

        let mut last_break = Instant::now();

        for index in 0..size {
            body.step(index)?;

            let has_next = index + 1 < size;
            if has_next && last_break.elapsed() > self.min_yield_interval {
                trace!("yielding after step {index}/{size}");
                task::yield_now().await;

                if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                    return Err(NetErr::Cancelled);
                }

                last_break = Instant::now();
            }
        }

        Ok(body.finish())
    }
}

impl Default for CooperativeLoop {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc, thread};
    use tokio_test::{assert_pending, assert_ready, task::spawn};

    /// Records every call into a shared log.
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        fail_at: Option<usize>,
        nap: Duration,
    }

    impl Recorder {
        fn new(log: &Rc<RefCell<Vec<String>>>) -> Self {
            Self {
                log: Rc::clone(log),
                fail_at: None,
                nap: Duration::ZERO,
            }
        }
    }

    impl LoopBody for Recorder {
        type Output = usize;

        fn step(&mut self, index: usize) -> Result<()> {
            if self.fail_at == Some(index) {
                return Err(NetErr::InvalidArgument(format!("step {index}")));
            }

            if !self.nap.is_zero() {
                thread::sleep(self.nap);
            }

            self.log.borrow_mut().push(format!("step {index}"));
            Ok(())
        }

        fn finish(self) -> usize {
            let mut log = self.log.borrow_mut();
            log.push("complete".to_string());
            log.len()
        }
    }

    fn huge() -> CooperativeLoop {
        CooperativeLoop::new(Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn steps_in_order_then_completes() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let out = huge().run(5, Recorder::new(&log)).await.unwrap();

        assert_eq!(
            *log.borrow(),
            ["step 0", "step 1", "step 2", "step 3", "step 4", "complete"]
        );
        assert_eq!(out, 6);
    }

    #[tokio::test]
    async fn zero_length_only_completes() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let out = huge().run(0, Recorder::new(&log)).await.unwrap();

        assert_eq!(*log.borrow(), ["complete"]);
        assert_eq!(out, 1);
    }

    #[tokio::test]
    async fn negative_length_is_rejected_up_front() {
        let log = Rc::new(RefCell::new(Vec::new()));

        let err = huge().run(-1, Recorder::new(&log)).await.unwrap_err();

        assert!(matches!(err, NetErr::InvalidArgument(_)));
        assert!(log.borrow().is_empty());
    }

    #[tokio::test]
    async fn step_errors_skip_completion() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut body = Recorder::new(&log);
        body.fail_at = Some(2);

        let err = huge().run(5, body).await.unwrap_err();

        assert!(matches!(err, NetErr::InvalidArgument(_)));
        assert_eq!(*log.borrow(), ["step 0", "step 1"]);
    }

    #[test]
    fn does_not_suspend_within_the_interval() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let lp = huge();

        let mut fut = spawn(lp.run(100, Recorder::new(&log)));

        // the whole loop runs on the first poll
        let out = assert_ready!(fut.poll());
        assert_eq!(out.unwrap(), 101);
    }

    #[test]
    fn suspends_between_steps_once_the_interval_elapses() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let lp = CooperativeLoop::new(Duration::ZERO);
        let mut body = Recorder::new(&log);
        body.nap = Duration::from_millis(1);

        let mut fut = spawn(lp.run(3, body));

        assert_pending!(fut.poll());
        assert_eq!(*log.borrow(), ["step 0"]);

        assert_pending!(fut.poll());
        assert_eq!(*log.borrow(), ["step 0", "step 1"]);

        // no yield after the last step
        let out = assert_ready!(fut.poll());
        assert_eq!(out.unwrap(), 4);
        assert_eq!(*log.borrow(), ["step 0", "step 1", "step 2", "complete"]);
    }

    #[test]
    fn cancellation_is_observed_at_the_yield_point() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let token = CancellationToken::new();
        let lp = CooperativeLoop::new(Duration::ZERO).with_cancellation(token.clone());
        let mut body = Recorder::new(&log);
        body.nap = Duration::from_millis(1);

        let mut fut = spawn(lp.run(10, body));

        assert_pending!(fut.poll());
        token.cancel();

        let out = assert_ready!(fut.poll());
        assert!(matches!(out, Err(NetErr::Cancelled)));
        assert_eq!(*log.borrow(), ["step 0"]);
    }
}
