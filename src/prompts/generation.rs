//! Prompt construction for Cryptol generation requests.

use crate::catalog::{Task, TaskType};
use crate::llm::Message;

/// System prompt asking for a single fenced Cryptol block.
pub const SYSTEM_PROMPT: &str =
    "Return exactly ONE fenced code block labeled `cryptol` and nothing else (no prose before/after).";

const FUNCTION_PROMPT_TEMPLATE: &str = "### Instruction:
Write a Cryptol function that implements the tasks described below.

### Request:
Task: {task}
";

const PROPERTY_PROMPT_TEMPLATE: &str = "### Instruction:
Write a Cryptol property that tests the function described below.

### Request:
Task: {task}
";

/// The system and user halves of one generation request.
#[derive(Debug, Clone)]
pub struct GenerationPrompt {
    pub system: String,
    pub user: String,
}

impl GenerationPrompt {
    /// Renders the prompt for a task, including its setup code when present.
    pub fn for_task(task: &Task) -> Self {
        let template = match task.task_type {
            TaskType::Function => FUNCTION_PROMPT_TEMPLATE,
            TaskType::Property => PROPERTY_PROMPT_TEMPLATE,
        };
        let mut user = template.replace("{task}", &task.prompt);

        if let Some(setup) = task.setup_code() {
            user.push_str(&format!(
                "\n### Additional setup code:\n```cryptol\n{}\n```",
                setup
            ));
        }

        Self {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }

    /// Chat messages sent to the model.
    pub fn messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }

    /// Both halves, labelled, for transcripts and the generation log.
    pub fn render(&self) -> String {
        format!("[SYSTEM]\n{}\n\n[USER]\n{}", self.system, self.user)
    }
}
