//! Line commands typed at the console prompt.

use shared::domain::{GenerationMode, HeadlineId, ImageStyle, ItemId, PromptField, TextLanguage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Fetch,
    Toggle(HeadlineId),
    Proceed(GenerationMode),
    EditPrompt(ItemId),
    SetPrompt { field: PromptField, text: String },
    Save,
    Cancel,
    Style(ImageStyle),
    Language(TextLanguage),
    Generate,
    EditImage(ItemId),
    Instruct(String),
    Apply,
    Export(ItemId),
    Back,
    Reset,
    State,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}', type 'help'")]
    Unknown(String),
    #[error("'{command}' needs {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("'{value}' is not {expected}")]
    InvalidArgument {
        value: String,
        expected: &'static str,
    },
}

pub const HELP: &str = "\
fetch                    fetch today's headlines
toggle <id>              select or unselect a headline
merge | individual       generate prompts from the selection
edit-prompt <item>       start editing an item's prompt
set <en|zh> <text>       change the prompt being edited
save | cancel            finish prompt or image editing
style <1-9>              choose the rendering style
lang <none|zh|en>        choose the lettering language
generate                 render every item
edit-image <item>        start editing a rendered image
instruct <text>          set the edit instruction
apply                    send the edit instruction
export <item>            save an item's media to the export directory
back                     return to headline selection
reset                    start over
state                    print the workflow state as JSON
help | quit";

pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "fetch" => Command::Fetch,
        "toggle" => Command::Toggle(headline_id("toggle", rest)?),
        "merge" => Command::Proceed(GenerationMode::Merge),
        "individual" => Command::Proceed(GenerationMode::Individual),
        "edit-prompt" => Command::EditPrompt(item_id("edit-prompt", rest)?),
        "set" => {
            let (field, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let field = match field.to_ascii_lowercase().as_str() {
                "en" => PromptField::English,
                "zh" => PromptField::Chinese,
                "" => {
                    return Err(ParseError::MissingArgument {
                        command: "set",
                        expected: "a field (en or zh) and text",
                    })
                }
                other => {
                    return Err(ParseError::InvalidArgument {
                        value: other.to_string(),
                        expected: "a prompt field (en or zh)",
                    })
                }
            };
            Command::SetPrompt {
                field,
                text: text.trim().to_string(),
            }
        }
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "style" => Command::Style(style(rest)?),
        "lang" => Command::Language(language(rest)?),
        "generate" => Command::Generate,
        "edit-image" => Command::EditImage(item_id("edit-image", rest)?),
        "instruct" => Command::Instruct(rest.to_string()),
        "apply" => Command::Apply,
        "export" => Command::Export(item_id("export", rest)?),
        "back" => Command::Back,
        "reset" => Command::Reset,
        "state" => Command::State,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn headline_id(command: &'static str, arg: &str) -> Result<HeadlineId, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument {
            command,
            expected: "a headline id",
        });
    }
    arg.parse()
        .map(HeadlineId)
        .map_err(|_| ParseError::InvalidArgument {
            value: arg.to_string(),
            expected: "a headline id",
        })
}

fn item_id(command: &'static str, arg: &str) -> Result<ItemId, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument {
            command,
            expected: "an item id",
        });
    }
    Ok(ItemId::from(arg))
}

/// Styles are picked by their 1-based position in the menu.
fn style(arg: &str) -> Result<ImageStyle, ParseError> {
    if arg.is_empty() {
        return Err(ParseError::MissingArgument {
            command: "style",
            expected: "a style number",
        });
    }
    arg.parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| ImageStyle::ALL.get(index).copied())
        .ok_or_else(|| ParseError::InvalidArgument {
            value: arg.to_string(),
            expected: "a style number from the menu",
        })
}

fn language(arg: &str) -> Result<TextLanguage, ParseError> {
    match arg.to_ascii_lowercase().as_str() {
        "none" => Ok(TextLanguage::None),
        "zh" => Ok(TextLanguage::TraditionalChinese),
        "en" => Ok(TextLanguage::English),
        "" => Err(ParseError::MissingArgument {
            command: "lang",
            expected: "none, zh or en",
        }),
        other => Err(ParseError::InvalidArgument {
            value: other.to_string(),
            expected: "a language (none, zh or en)",
        }),
    }
}
