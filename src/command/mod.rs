use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

pub mod catalog;

/// Category of an application command, serialized as the platform's integer discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CommandKind {
    #[default]
    ChatInput,
    User,
    Message,
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> u8 {
        match kind {
            CommandKind::ChatInput => 1,
            CommandKind::User => 2,
            CommandKind::Message => 3,
        }
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(CommandKind::ChatInput),
            2 => Ok(CommandKind::User),
            3 => Ok(CommandKind::Message),
            other => Err(format!("unknown command type {}", other)),
        }
    }
}

/// Type of a command parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl From<OptionKind> for u8 {
    fn from(kind: OptionKind) -> u8 {
        match kind {
            OptionKind::SubCommand => 1,
            OptionKind::SubCommandGroup => 2,
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }
}

impl TryFrom<u8> for OptionKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => OptionKind::SubCommand,
            2 => OptionKind::SubCommandGroup,
            3 => OptionKind::String,
            4 => OptionKind::Integer,
            5 => OptionKind::Boolean,
            6 => OptionKind::User,
            7 => OptionKind::Channel,
            8 => OptionKind::Role,
            9 => OptionKind::Mentionable,
            10 => OptionKind::Number,
            11 => OptionKind::Attachment,
            other => return Err(format!("unknown option type {}", other)),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    String(String),
    Integer(i64),
    Number(f64),
}

impl From<&str> for ChoiceValue {
    fn from(value: &str) -> Self {
        ChoiceValue::String(value.to_string())
    }
}

impl From<i64> for ChoiceValue {
    fn from(value: i64) -> Self {
        ChoiceValue::Integer(value)
    }
}

/// A (display label, machine value) pair constraining the input of an option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    /// Label shown to the user.
    pub name: String,
    /// Value sent back to the bot when the choice is picked.
    pub value: ChoiceValue,
}

/// A parameter of a command.
/// Sub-command options carry their own nested `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<OptionChoice>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionDescriptor>,
}

impl OptionDescriptor {
    pub fn new(name: &str, description: &str, kind: OptionKind) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind,
            required: false,
            choices: None,
            options: vec![],
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Appends a choice, keeping the order in which choices are given.
    pub fn choice(mut self, name: &str, value: impl Into<ChoiceValue>) -> Self {
        self.choices.get_or_insert_with(Vec::new).push(OptionChoice {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    #[cfg(test)]
    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }
}

fn default_permission() -> bool {
    true
}

/// Declarative definition of a command exposed by the bot.
/// This is the unit sent to the remote registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Identifier of the command, unique in the application's namespace.
    pub name: String,
    pub description: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    #[serde(default)]
    pub options: Vec<OptionDescriptor>,
    /// Visibility of the command before any per-guild override.
    #[serde(default = "default_permission")]
    pub default_permission: bool,
}

impl CommandDescriptor {
    pub fn chat_input(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            kind: CommandKind::ChatInput,
            options: vec![],
            default_permission: true,
        }
    }

    pub fn option(mut self, option: OptionDescriptor) -> Self {
        self.options.push(option);
        self
    }
}

fn validate_options(owner: &str, options: &[OptionDescriptor]) -> Result<(), SyncError> {
    let mut names = HashSet::new();

    for option in options {
        if !names.insert(option.name.as_str()) {
            return Err(SyncError::InvalidDescriptor(format!(
                "option `{}` is declared twice in `{}`",
                option.name, owner
            )));
        }

        if let Some(choices) = &option.choices {
            if choices.is_empty() {
                return Err(SyncError::InvalidDescriptor(format!(
                    "option `{}` of `{}` has an empty choice list",
                    option.name, owner
                )));
            }

            // f64 values rule out a hash set, the lists are tiny anyway
            for (i, choice) in choices.iter().enumerate() {
                if choices[..i].iter().any(|c| c.value == choice.value) {
                    return Err(SyncError::InvalidDescriptor(format!(
                        "choice `{}` of option `{}` in `{}` repeats a value",
                        choice.name, option.name, owner
                    )));
                }
            }
        }

        validate_options(&format!("{} {}", owner, option.name), &option.options)?;
    }

    Ok(())
}

/// Checks the invariants of a batch before anything is sent:
/// unique command names, unique option names per command,
/// and non-empty choice lists without repeated values.
pub fn validate_batch(commands: &[CommandDescriptor]) -> Result<(), SyncError> {
    let mut names = HashSet::new();

    for command in commands {
        if !names.insert(command.name.as_str()) {
            return Err(SyncError::InvalidDescriptor(format!(
                "command `{}` is declared twice",
                command.name
            )));
        }

        validate_options(&command.name, &command.options)?;
    }

    Ok(())
}
