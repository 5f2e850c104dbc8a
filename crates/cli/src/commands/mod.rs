//! Subcommand implementations

pub mod local;
pub mod remote;

use crate::output::{print_table, split_role};
use tabled::Tabled;

/// Row for transcript tables
#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Content")]
    content: String,
}

/// Print a rendered transcript as a table
pub(crate) fn print_transcript(messages: &[String]) {
    let rows: Vec<MessageRow> = messages
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let (role, content) = split_role(line);
            MessageRow {
                index: i + 1,
                role: role.to_string(),
                content: content.to_string(),
            }
        })
        .collect();
    print_table(&rows);
}
