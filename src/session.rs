// src/session.rs
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::info;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::pipeline::{run_pipeline, AnalysisResult};

pub const TOTAL_QUESTIONS: u32 = 5;
pub const QUESTION_DURATION: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Intro,
    Start,
    Test,
    Processing,
    Result,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while in the {stage:?} stage")]
    InvalidTransition { stage: Stage, action: &'static str },
}

/// What a clock tick changed during the test stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickEvent {
    Unchanged,
    Question(u32),
    Finished,
}

/// One run of the screening flow: intro, start, timed questions, processing, result.
#[derive(Debug)]
pub struct TestSession {
    stage: Stage,
    current_question: u32,
    recording: Option<PathBuf>,
    result: Option<AnalysisResult>,
}

impl Default for TestSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TestSession {
    pub fn new() -> Self {
        Self {
            stage: Stage::Intro,
            current_question: 0,
            recording: None,
            result: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// 1-based while testing, 0 before.
    pub fn current_question(&self) -> u32 {
        self.current_question
    }

    pub fn recording(&self) -> Option<&Path> {
        self.recording.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    fn expect_stage(&self, stage: Stage, action: &'static str) -> Result<(), SessionError> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                stage: self.stage,
                action,
            })
        }
    }

    pub fn open(&mut self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Intro, "open the start screen")?;
        self.stage = Stage::Start;
        Ok(())
    }

    /// Starts the timed questions; `recording` is where samples are being captured.
    pub fn begin_test(&mut self, recording: impl Into<PathBuf>) -> Result<(), SessionError> {
        self.expect_stage(Stage::Start, "begin the test")?;
        self.recording = Some(recording.into());
        self.current_question = 1;
        self.stage = Stage::Test;
        info!("test started, question 1 of {TOTAL_QUESTIONS}");
        Ok(())
    }

    /// Advances questions from the elapsed test time. Question `n` ends at `n * QUESTION_DURATION`.
    pub fn tick(&mut self, elapsed: Duration) -> Result<TickEvent, SessionError> {
        self.expect_stage(Stage::Test, "advance the test clock")?;
        let mut event = TickEvent::Unchanged;
        while elapsed >= QUESTION_DURATION * self.current_question {
            if self.current_question < TOTAL_QUESTIONS {
                self.current_question += 1;
                event = TickEvent::Question(self.current_question);
            } else {
                self.finish_test()?;
                return Ok(TickEvent::Finished);
            }
        }
        Ok(event)
    }

    pub fn finish_test(&mut self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Test, "finish the test")?;
        self.stage = Stage::Processing;
        info!("test finished after question {}", self.current_question);
        Ok(())
    }

    pub fn complete(&mut self, result: AnalysisResult) -> Result<(), SessionError> {
        self.expect_stage(Stage::Processing, "store a result")?;
        self.result = Some(result);
        self.stage = Stage::Result;
        Ok(())
    }

    /// Back to the intro for the next participant.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        self.expect_stage(Stage::Result, "restart")?;
        *self = Self::new();
        Ok(())
    }
}

/// Messages from the analysis worker to whoever is displaying progress.
#[derive(Debug)]
pub enum WorkerMessage {
    Log(String),
    Finished(AnalysisResult),
}

/// Runs the pipeline on a background thread and reports back over `tx`.
pub fn spawn_analysis(
    path: impl Into<PathBuf>,
    config: PipelineConfig,
    tx: Sender<WorkerMessage>,
) -> JoinHandle<()> {
    let path = path.into();
    thread::spawn(move || {
        tx.send(WorkerMessage::Log(format!("processing {}", path.display())))
            .ok();
        let result = if path.exists() {
            run_pipeline(&path, &config)
        } else {
            AnalysisResult::Failure {
                message: format!("sample file not found: {}", path.display()),
            }
        };
        tx.send(WorkerMessage::Finished(result)).ok();
    })
}
