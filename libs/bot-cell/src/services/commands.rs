// libs/bot-cell/src/services/commands.rs
use crate::models::BotCommand;

pub const HELP_TEXT: &str = "Verfügbare Befehle:\n\
/activate <ID> - SMS-Anfrage aktivieren\n\
/send <ID> <CODE> - Code an Mitarbeiter senden\n\
/complete <ID> - Anfrage abschließen\n\
/termine - heutige Termine anzeigen";

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw?.trim_start_matches('#').parse::<i64>().ok().filter(|id| *id > 0)
}

/// Parses a chat message. Group chats append the bot name (`/send@bot 5 1234`);
/// anything unknown or malformed becomes `Help`.
pub fn parse_command(text: &str) -> BotCommand {
    let mut parts = text.split_whitespace();
    let Some(head) = parts.next() else {
        return BotCommand::Help;
    };
    let name = head.split('@').next().unwrap_or(head).to_lowercase();

    let command = match name.as_str() {
        "/activate" => parse_id(parts.next()).map(BotCommand::Activate),
        "/complete" => parse_id(parts.next()).map(BotCommand::Complete),
        "/send" => {
            let id = parse_id(parts.next());
            let code = parts.next().map(str::to_string);
            match (id, code) {
                (Some(id), Some(code)) => Some(BotCommand::SendCode { id, code }),
                _ => None,
            }
        }
        "/termine" => Some(BotCommand::TodaysAppointments),
        _ => None,
    };

    // trailing arguments are a typo, not a second command
    match (command, parts.next()) {
        (Some(command), None) => command,
        _ => BotCommand::Help,
    }
}
