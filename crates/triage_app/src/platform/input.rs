use triage_core::{Action, AppViewModel, Msg, View};

/// One line typed at the prompt, interpreted against what is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Msgs(Vec<Msg>),
    SetEndpoint(Option<String>),
    SetApiKey(Option<String>),
    Help,
    Quit,
    Unknown(String),
    Nothing,
}

impl Command {
    fn msg(msg: Msg) -> Self {
        Command::Msgs(vec![msg])
    }
}

pub const HELP: &str = "\
review:   x close | s save | f favorite | n [text] note | a summarize | o open | k skip
saved:    l list | r review | star <n> | del <n> | visit <n> | restore | clear
session:  refresh | settings | help | q quit
settings: endpoint <url> | key <api key> | done";

pub fn parse(line: &str, view: &AppViewModel) -> Command {
    let line = line.trim();

    if view.editing_note {
        return match line {
            "" | "/cancel" => Command::msg(Msg::NoteCancelled),
            text => Command::msg(Msg::NoteConfirmed(text.to_string())),
        };
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    if view.settings_open {
        match word {
            "endpoint" => return Command::SetEndpoint(non_empty(rest)),
            "key" => return Command::SetApiKey(non_empty(rest)),
            "done" => return Command::msg(Msg::SettingsClosed),
            _ => {}
        }
    }

    match word {
        "" => Command::Nothing,
        "x" | "close" => Command::msg(Msg::ActionRequested(Action::Close)),
        "s" | "save" => Command::msg(Msg::ActionRequested(Action::Save)),
        "f" | "favorite" => Command::msg(Msg::ActionRequested(Action::Favorite)),
        "a" | "summarize" => Command::msg(Msg::ActionRequested(Action::Summarize)),
        "o" | "open" => Command::msg(Msg::ActionRequested(Action::Open)),
        "k" | "skip" => Command::msg(Msg::ActionRequested(Action::Skip)),
        "n" | "note" => {
            let mut msgs = vec![Msg::ActionRequested(Action::Note)];
            if !rest.is_empty() {
                msgs.push(Msg::NoteConfirmed(rest.to_string()));
            }
            Command::Msgs(msgs)
        }
        "l" | "list" => Command::msg(Msg::ViewSelected(View::List)),
        "r" | "review" => Command::msg(Msg::ViewSelected(View::Review)),
        "refresh" => Command::msg(Msg::RefreshRequested),
        "star" => saved_row(rest, view, |id| Msg::ToggleFavoriteClicked { id }),
        "del" | "delete" => saved_row(rest, view, |id| Msg::DeleteSavedClicked { id }),
        "visit" => saved_row(rest, view, |id| Msg::OpenSavedClicked { id }),
        "restore" => Command::msg(Msg::RestoreSavedClicked),
        "clear" => Command::msg(Msg::ClearSavedClicked),
        "settings" => Command::msg(Msg::SettingsOpened),
        "?" | "help" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Resolves a 1-based row number from the saved list.
fn saved_row(arg: &str, view: &AppViewModel, to_msg: impl FnOnce(String) -> Msg) -> Command {
    arg.parse::<usize>()
        .ok()
        .and_then(|row| row.checked_sub(1))
        .and_then(|index| view.saved.get(index))
        .map(|row| Command::msg(to_msg(row.id.clone())))
        .unwrap_or_else(|| Command::Unknown(format!("no saved row {arg:?}")))
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
