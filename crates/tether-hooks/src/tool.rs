use crate::rejection::Rejection;
use serde::{Deserialize, Serialize};
use tether_core::MutationClass;
use tether_trace::LessonCategory;

/// Whether a tool changes the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    Benign,
    Mutating,
}

/// The privileged benign action: the only way to activate an intent.
pub const SELECT_ACTIVE_INTENT: &str = "select_active_intent";

/// Fixed classification registry. Unknown tools are not admitted.
pub fn classify_tool(tool_name: &str) -> Option<ToolClass> {
    match tool_name {
        "write_to_file" | "delete_file" | "execute_command" => Some(ToolClass::Mutating),
        "select_active_intent" | "read_file" | "list_files" | "search_files"
        | "record_lesson" => Some(ToolClass::Benign),
        _ => None,
    }
}

/// Arguments of `write_to_file`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WriteArgs {
    #[serde(alias = "file", alias = "filename")]
    pub path: String,
    pub content: String,
    #[serde(default, alias = "lineCount", skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    #[serde(default, alias = "intentId", skip_serializing_if = "Option::is_none")]
    pub intent_id: Option<String>,
    #[serde(default, alias = "mutationClass", skip_serializing_if = "Option::is_none")]
    pub mutation_class: Option<MutationClass>,
    /// Fingerprint of the content the agent last read, or `new-file`.
    #[serde(default, alias = "initialHash", skip_serializing_if = "Option::is_none")]
    pub initial_hash: Option<String>,
    #[serde(default, alias = "startLine", skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    #[serde(default, alias = "endLine", skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
}

/// A tool invocation with arguments validated against the tool's shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tool_name", content = "args", rename_all = "snake_case")]
pub enum ToolCall {
    SelectActiveIntent {
        #[serde(alias = "intentId")]
        intent_id: String,
    },
    WriteToFile(WriteArgs),
    DeleteFile {
        #[serde(alias = "file", alias = "filename")]
        path: String,
    },
    ExecuteCommand {
        command: String,
        #[serde(default)]
        cwd: Option<String>,
    },
    ReadFile {
        path: String,
    },
    ListFiles {
        #[serde(default)]
        path: Option<String>,
    },
    SearchFiles {
        path: String,
        regex: String,
    },
    RecordLesson {
        lesson: String,
        #[serde(default)]
        category: Option<LessonCategory>,
    },
}

impl ToolCall {
    /// Validate an untyped `(tool_name, args)` pair at the pipeline boundary.
    pub fn from_parts(tool_name: &str, args: serde_json::Value) -> Result<Self, Rejection> {
        if classify_tool(tool_name).is_none() {
            return Err(Rejection::malformed(format!("unknown tool: {tool_name}")));
        }
        let args = if args.is_null() {
            serde_json::Value::Object(Default::default())
        } else {
            args
        };
        let tagged = serde_json::json!({ "tool_name": tool_name, "args": args });
        serde_json::from_value(tagged)
            .map_err(|e| Rejection::malformed(format!("invalid arguments for {tool_name}: {e}")))
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::SelectActiveIntent { .. } => "select_active_intent",
            ToolCall::WriteToFile(_) => "write_to_file",
            ToolCall::DeleteFile { .. } => "delete_file",
            ToolCall::ExecuteCommand { .. } => "execute_command",
            ToolCall::ReadFile { .. } => "read_file",
            ToolCall::ListFiles { .. } => "list_files",
            ToolCall::SearchFiles { .. } => "search_files",
            ToolCall::RecordLesson { .. } => "record_lesson",
        }
    }

    pub fn class(&self) -> ToolClass {
        match self {
            ToolCall::WriteToFile(_) | ToolCall::DeleteFile { .. } | ToolCall::ExecuteCommand { .. } => {
                ToolClass::Mutating
            }
            ToolCall::SelectActiveIntent { .. }
            | ToolCall::ReadFile { .. }
            | ToolCall::ListFiles { .. }
            | ToolCall::SearchFiles { .. }
            | ToolCall::RecordLesson { .. } => ToolClass::Benign,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.class() == ToolClass::Mutating
    }

    /// The workspace path this call targets, as supplied by the agent.
    pub fn target_path(&self) -> Option<&str> {
        match self {
            ToolCall::WriteToFile(w) => Some(&w.path),
            ToolCall::DeleteFile { path }
            | ToolCall::ReadFile { path }
            | ToolCall::SearchFiles { path, .. } => Some(path),
            ToolCall::ListFiles { path } => path.as_deref(),
            ToolCall::SelectActiveIntent { .. }
            | ToolCall::ExecuteCommand { .. }
            | ToolCall::RecordLesson { .. } => None,
        }
    }

    /// Short human description for approval prompts.
    pub fn describe(&self) -> String {
        match self {
            ToolCall::ExecuteCommand { command, .. } => format!("execute command `{command}`"),
            other => format!(
                "{} {}",
                other.name().replace('_', " "),
                other.target_path().unwrap_or("(unknown file)")
            ),
        }
    }
}
