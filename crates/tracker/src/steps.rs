use serde::{Deserialize, Serialize};

pub const STEP_COUNT: u8 = 4;

/// One fixed phase of the backend processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDefinition {
    pub id: u8,
    pub label: &'static str,
    pub description: &'static str,
    /// Overall percentage the job reaches when this step finishes.
    pub nominal_progress: u8,
}

pub static PROCESSING_STEPS: [StepDefinition; STEP_COUNT as usize] = [
    StepDefinition {
        id: 1,
        label: "Audio download",
        description: "Extracting the audio track from the source video",
        nominal_progress: 25,
    },
    StepDefinition {
        id: 2,
        label: "Transcription",
        description: "Converting the audio to text",
        nominal_progress: 50,
    },
    StepDefinition {
        id: 3,
        label: "AI analysis",
        description: "Analyzing the content and finding key moments",
        nominal_progress: 75,
    },
    StepDefinition {
        id: 4,
        label: "Content generation",
        description: "Writing articles, posts and summaries",
        nominal_progress: 100,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStep {
    pub definition: &'static StepDefinition,
    pub status: StepStatus,
}

impl ProcessingStep {
    pub fn id(&self) -> u8 {
        self.definition.id
    }

    pub fn label(&self) -> &'static str {
        self.definition.label
    }
}

pub fn step_status(id: u8, current_step: u8) -> StepStatus {
    if current_step >= id {
        StepStatus::Completed
    } else if current_step + 1 == id {
        StepStatus::Active
    } else {
        StepStatus::Pending
    }
}

pub fn derive_steps(current_step: u8) -> Vec<ProcessingStep> {
    PROCESSING_STEPS
        .iter()
        .map(|definition| ProcessingStep {
            definition,
            status: step_status(definition.id, current_step),
        })
        .collect()
}
