//! Staged conversion pipeline.
//!
//! A pipeline is an ordered list of stages sharing one context. The driver
//! calls the current stage's [`Stage::step`] until it reports
//! [`StageStatus::Finished`], then moves to the next stage. The whole
//! pipeline is finished once the index runs past the last stage.
//!
//! ```text
//! state  = (stage index, iterations of current stage)
//! step() : iterations += 1
//!          iterations > ceiling      -> IterationCeiling error
//!          stage.step(ctx) Finished  -> index += 1, iterations = 0
//! done   : index == stages.len()
//! ```
//!
//! The ceiling turns a stage that forgets to finish into an immediate error
//! instead of a hang.

use tracing::debug;

use crate::kicad::{ConvertError, ConvertResult};

/// Default per-stage iteration ceiling.
pub const DEFAULT_MAX_STAGE_ITERATIONS: usize = 1000;

/// Outcome of one stage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// The stage has more work; call it again.
    Continue,
    /// The stage is done.
    Finished,
}

/// A unit of work in a pipeline, bound to one context type.
pub trait Stage<C> {
    /// Stage name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Performs one increment of work.
    ///
    /// A stage with nothing left to do must return
    /// [`StageStatus::Finished`].
    ///
    /// # Errors
    ///
    /// Returns an error if the context is missing state this stage needs.
    fn step(&mut self, ctx: &mut C) -> ConvertResult<StageStatus>;
}

/// Drives a list of stages over one context.
pub struct Pipeline<C> {
    context: C,
    stages: Vec<Box<dyn Stage<C>>>,
    current: usize,
    iterations: usize,
    max_iterations: usize,
}

impl<C> Pipeline<C> {
    /// Creates a pipeline over `context`.
    #[must_use]
    pub fn new(context: C, stages: Vec<Box<dyn Stage<C>>>) -> Self {
        Self {
            context,
            stages,
            current: 0,
            iterations: 0,
            max_iterations: DEFAULT_MAX_STAGE_ITERATIONS,
        }
    }

    /// Sets the per-stage iteration ceiling.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Returns the per-stage iteration ceiling.
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Returns true once every stage has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current >= self.stages.len()
    }

    /// Name of the stage that will run on the next [`Pipeline::step`].
    #[must_use]
    pub fn current_stage(&self) -> Option<&'static str> {
        self.stages.get(self.current).map(|s| s.name())
    }

    /// Advances the current stage by one increment.
    ///
    /// Does nothing once the pipeline is finished.
    ///
    /// # Errors
    ///
    /// Returns the stage's error, or [`ConvertError::IterationCeiling`] if
    /// the stage is called more than the ceiling allows without finishing.
    pub fn step(&mut self) -> ConvertResult<()> {
        let Some(stage) = self.stages.get_mut(self.current) else {
            return Ok(());
        };

        self.iterations += 1;
        if self.iterations > self.max_iterations {
            return Err(ConvertError::iteration_ceiling(
                stage.name(),
                self.max_iterations,
            ));
        }

        if stage.step(&mut self.context)? == StageStatus::Finished {
            debug!(
                stage = stage.name(),
                iterations = self.iterations,
                "Stage finished"
            );
            self.current += 1;
            self.iterations = 0;
        }
        Ok(())
    }

    /// Steps until every stage has finished.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by [`Pipeline::step`].
    pub fn run_until_finished(&mut self) -> ConvertResult<()> {
        while !self.is_finished() {
            self.step()?;
        }
        Ok(())
    }

    /// Shared context.
    #[must_use]
    pub const fn context(&self) -> &C {
        &self.context
    }

    /// Consumes the pipeline and returns its context.
    #[must_use]
    pub fn into_context(self) -> C {
        self.context
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        log: Vec<&'static str>,
    }

    /// Finishes after `remaining` continues.
    struct Countdown {
        name: &'static str,
        remaining: usize,
    }

    impl Stage<Counter> for Countdown {
        fn name(&self) -> &'static str {
            self.name
        }

        fn step(&mut self, ctx: &mut Counter) -> ConvertResult<StageStatus> {
            ctx.log.push(self.name);
            if self.remaining == 0 {
                return Ok(StageStatus::Finished);
            }
            self.remaining -= 1;
            Ok(StageStatus::Continue)
        }
    }

    struct Forever;

    impl Stage<Counter> for Forever {
        fn name(&self) -> &'static str {
            "Forever"
        }

        fn step(&mut self, _ctx: &mut Counter) -> ConvertResult<StageStatus> {
            Ok(StageStatus::Continue)
        }
    }

    #[test]
    fn stages_run_in_order() {
        let stages: Vec<Box<dyn Stage<Counter>>> = vec![
            Box::new(Countdown { name: "a", remaining: 2 }),
            Box::new(Countdown { name: "b", remaining: 0 }),
        ];
        let mut pipeline = Pipeline::new(Counter::default(), stages);
        pipeline.run_until_finished().unwrap();

        assert!(pipeline.is_finished());
        assert_eq!(pipeline.context().log, vec!["a", "a", "a", "b"]);
    }

    #[test]
    fn driver_waits_for_finished() {
        let stages: Vec<Box<dyn Stage<Counter>>> =
            vec![Box::new(Countdown { name: "a", remaining: 1 })];
        let mut pipeline = Pipeline::new(Counter::default(), stages);

        pipeline.step().unwrap();
        assert_eq!(pipeline.current_stage(), Some("a"));
        pipeline.step().unwrap();
        assert!(pipeline.is_finished());
        pipeline.step().unwrap();
        assert_eq!(pipeline.context().log.len(), 2);
    }

    #[test]
    fn runaway_stage_hits_ceiling() {
        let stages: Vec<Box<dyn Stage<Counter>>> = vec![Box::new(Forever)];
        let mut pipeline = Pipeline::new(Counter::default(), stages).with_max_iterations(5);

        let err = pipeline.run_until_finished().unwrap_err();
        assert!(matches!(
            err,
            ConvertError::IterationCeiling { ref stage, limit: 5 } if stage == "Forever"
        ));
    }

    #[test]
    fn default_ceiling() {
        let pipeline: Pipeline<Counter> = Pipeline::new(Counter::default(), Vec::new());
        assert_eq!(pipeline.max_iterations(), DEFAULT_MAX_STAGE_ITERATIONS);
        assert!(pipeline.is_finished());
    }

    #[test]
    fn ceiling_counts_per_stage() {
        let stages: Vec<Box<dyn Stage<Counter>>> = vec![
            Box::new(Countdown { name: "a", remaining: 3 }),
            Box::new(Countdown { name: "b", remaining: 3 }),
        ];
        let mut pipeline = Pipeline::new(Counter::default(), stages).with_max_iterations(4);
        pipeline.run_until_finished().unwrap();
        assert_eq!(pipeline.context().log.len(), 8);
    }
}
