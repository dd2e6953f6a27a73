use broker_filter::{known_aliases, parse_filter_args};
use broker_session::FilterSession;

/// Route one user command line. Returns the user-facing output lines; every
/// failure mode becomes a message, never an error — the loop must not die on
/// a typo.
pub fn handle_command_line(session: &mut FilterSession, line: &str) -> Vec<String> {
    let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
    let Some((head, args)) = tokens.split_first() else {
        return vec![usage_line()];
    };

    match head.to_ascii_lowercase().as_str() {
        "filter" => match parse_filter_args(args) {
            Ok(command) => vec![session.apply_command(command)],
            Err(e) => vec![e.to_string()],
        },
        "filterinfo" => filterinfo(args.first().map(String::as_str)),
        other => vec![format!("Unknown command '{other}'. {}", usage_line())],
    }
}

fn usage_line() -> String {
    "Commands: 'filter <type>... [count]', 'filter off', 'filterinfo [help|types]'.".to_string()
}

fn filterinfo(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => vec![
            "This is a quick explanation of how this module works.".into(),
            "Command 'filterinfo help' will show how to type the commands.".into(),
            "Command 'filterinfo types' will show the available types of rolls.".into(),
        ],
        Some("help") => vec![
            "The filter commands should always be 'filter type number'.".into(),
            "'filter' is the general command, no need to explain much.".into(),
            "'type' is the type of roll you want shown (see 'filterinfo types').".into(),
            "'number' is the minimum amount of rolls you're looking for.".into(),
            "Example: a minimum of 2 Physical Amplification rolls is 'filter pamp 2'.".into(),
            "'filter off' will turn off/reset the filter.".into(),
        ],
        Some("types") => {
            let mut lines = vec![
                "This is a quick list of all the available roll types.".to_string(),
                "'hp' shows Max Health rolls.".into(),
                "'mp' shows Max Mana rolls.".into(),
                "'cf' shows Critical Factor rolls.".into(),
                "'phys' shows Physical Amplification, Crit Power and Piercing rolls.".into(),
                "'mag' shows Magical Amplification, Crit Power and Piercing rolls.".into(),
                "'pamp' shows Physical Amplification rolls.".into(),
                "'mamp' shows Magical Amplification rolls.".into(),
                "'pcp' shows Physical Crit Power rolls.".into(),
                "'mcp' shows Magical Crit Power rolls.".into(),
                "'pres' shows Physical Resistance rolls.".into(),
                "'mres' shows Magical Resistance rolls.".into(),
                "'ppier' shows Physical Piercing rolls.".into(),
                "'mpier' shows Magical Piercing rolls.".into(),
            ];
            lines.push(format!(
                "Aliases: {}.",
                known_aliases().collect::<Vec<_>>().join(", ")
            ));
            lines
        }
        Some(other) => vec![format!(
            "Unknown filterinfo topic '{other}'. Try 'filterinfo help' or 'filterinfo types'."
        )],
    }
}
