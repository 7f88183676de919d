use crate::collaborators::IssueSummary;
use crate::mention_aggregator::MentionMap;

/// Renders the mention digest, or `None` when nobody was mentioned.
pub fn render_mention_digest(mentions: &MentionMap, window_hours: u64) -> Option<String> {
    if mentions.values().all(Vec::is_empty) {
        return None;
    }
    let mut lines = vec![format!("*Tracked Mentions (Last {window_hours} Hours):*")];
    for (person, links) in mentions {
        if links.is_empty() {
            continue;
        }
        lines.push(format!("<@{person}>"));
        for (index, link) in links.iter().enumerate() {
            lines.push(format!("    {}. <{link}|View Thread>", index + 1));
        }
    }
    Some(lines.join("\n"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneeIssues {
    pub assignee: String,
    pub issues: Vec<IssueSummary>,
}

pub fn board_jql(project_key: &str, assignee: &str) -> String {
    format!("project = \"{project_key}\" AND assignee = \"{assignee}\"")
}

pub fn render_board_digest(project_key: &str, sections: &[AssigneeIssues]) -> String {
    let mut lines = vec![format!("*{project_key} Board Tickets (In Progress):*")];
    for section in sections {
        lines.push(format!("{}:", section.assignee));
        if section.issues.is_empty() {
            lines.push("    No tickets in progress.".to_string());
            continue;
        }
        for (index, issue) in section.issues.iter().enumerate() {
            lines.push(format!(
                "    {}. *{}*: {} - <{}|Link>",
                index + 1,
                issue.key,
                issue.summary,
                issue.url
            ));
        }
    }
    lines.join("\n")
}
