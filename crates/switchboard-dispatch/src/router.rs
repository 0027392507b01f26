//! Event routing.
//!
//! The platform delivers nested commands as a top-level name plus a chain of
//! single sub-command or group options. Routing walks that chain to recover
//! the full command name and the option list of the selected leaf.

use std::collections::HashMap;

use crate::model::InteractionOption;
use crate::path::path_to_string;

/// Leaf options keyed by lowercase name.
pub type OptionMap = HashMap<String, InteractionOption>;

/// Resolves the full command name and the leaf option list.
///
/// Descends while there is exactly one option and it is a branch
/// (sub-command or group), appending its lowercased name.
pub fn resolve_command_name<'a>(
    top_level: &str,
    options: &'a [InteractionOption],
) -> (String, &'a [InteractionOption]) {
    let mut segments = vec![top_level.to_lowercase()];
    let mut current = options;
    while let [only] = current {
        if !only.kind.is_branch() {
            break;
        }
        segments.push(only.name.to_lowercase());
        current = &only.options;
    }
    (path_to_string(&segments), current)
}

/// Indexes leaf options by lowercase name.
pub fn flatten_options(options: &[InteractionOption]) -> OptionMap {
    options
        .iter()
        .map(|o| (o.name.to_lowercase(), o.clone()))
        .collect()
}

/// The option the user is currently typing, if any.
pub fn focused_option(options: &[InteractionOption]) -> Option<&InteractionOption> {
    options.iter().find(|o| o.focused)
}
