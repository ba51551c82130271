use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt::Write;

use crate::comments::CommentTree;
use crate::models::{Community, Page, Post, Project, User, VoteValue};
use crate::votes::Tally;

/// Replies deeper than this are drawn at this indentation.
pub const MAX_INDENT_DEPTH: usize = 6;

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}

fn when(created_at: Option<DateTime<Utc>>) -> String {
    created_at
        .map(|dt| format_relative_time(&dt.naive_utc()))
        .unwrap_or_default()
}

fn vote_marker(vote: VoteValue) -> &'static str {
    match vote {
        VoteValue::Up => "▲",
        VoteValue::Down => "▼",
        VoteValue::Neutral => "·",
    }
}

pub fn tally_line(tally: &Tally) -> String {
    format!("{} {}", vote_marker(tally.user_vote), tally.score)
}

pub fn user_line(user: &User) -> String {
    format!("{} <{}> ({})", user.username, user.email, user.role)
}

pub fn community_card(community: &Community) -> String {
    let mut out = String::new();
    let _ = write!(out, "{} [{}]", community.name, community.slug);
    if community.is_member {
        out.push_str("  (member)");
    }
    let _ = write!(out, "\n  {} members", community.member_count);
    if !community.owner.is_empty() {
        let _ = write!(out, " · owner {}", community.owner);
    }
    if !community.description.is_empty() {
        let _ = write!(out, "\n  {}", community.description);
    }
    out
}

pub fn post_card(post: &Post) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{} {:>4}  {}  (#{})",
        vote_marker(post.user_vote.unwrap_or_default()),
        post.score,
        post.title,
        post.id
    );
    let mut meta = vec![post.post_type.as_str().to_string()];
    if !post.author.is_empty() {
        meta.push(format!("by {}", post.author));
    }
    if !post.community.is_empty() {
        meta.push(format!("in {}", post.community));
    }
    let age = when(post.created_at);
    if !age.is_empty() {
        meta.push(age);
    }
    meta.push(format!("{} comments", post.comment_count));
    let _ = write!(out, "\n        {}", meta.join(" · "));
    out
}

pub fn post_detail(post: &Post) -> String {
    let mut out = post_card(post);
    if !post.content.is_empty() {
        let _ = write!(out, "\n\n{}", post.content);
    }
    out
}

pub fn project_card(project: &Project) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "{} {:>4}  {}  [{}]  (#{})",
        vote_marker(project.user_vote.unwrap_or_default()),
        project.vote_score,
        project.title,
        project.status,
        project.id
    );
    let mut meta = Vec::new();
    if !project.owner.is_empty() {
        meta.push(format!("by {}", project.owner));
    }
    if !project.community.is_empty() {
        meta.push(format!("in {}", project.community));
    }
    let age = when(project.created_at);
    if !age.is_empty() {
        meta.push(age);
    }
    if !meta.is_empty() {
        let _ = write!(out, "\n        {}", meta.join(" · "));
    }
    out
}

pub fn project_detail(project: &Project) -> String {
    let mut out = project_card(project);
    if !project.description.is_empty() {
        let _ = write!(out, "\n\n{}", project.description);
    }
    out
}

pub fn page<T>(page: &Page<T>, card: impl Fn(&T) -> String, empty: &str) -> String {
    if page.items.is_empty() {
        return empty.to_string();
    }
    let mut out: Vec<String> = page.items.iter().map(card).collect();
    out.push(format!(
        "-- page {} · {} per page · {} total --",
        page.page, page.per_page, page.total
    ));
    out.join("\n")
}

/// Render a thread recursively by depth. Indentation stops growing at
/// [`MAX_INDENT_DEPTH`]; deeper replies are marked with their real depth.
pub fn comment_tree(tree: &CommentTree) -> String {
    if tree.is_empty() {
        return "No comments yet.".to_string();
    }

    let mut lines = Vec::with_capacity(tree.len());
    for (depth, comment) in tree.walk() {
        let indent = "  ".repeat(depth.min(MAX_INDENT_DEPTH));
        let overflow = if depth > MAX_INDENT_DEPTH {
            format!("[{}] ", depth)
        } else {
            String::new()
        };
        let age = when(comment.created_at);
        let header = if age.is_empty() {
            format!("{}{}{} (#{})", indent, overflow, comment.author, comment.id)
        } else {
            format!(
                "{}{}{} · {} (#{})",
                indent, overflow, comment.author, age, comment.id
            )
        };
        lines.push(header);
        for text in comment.content.lines() {
            lines.push(format!("{}  {}", indent, text));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Comment;
    use chrono::NaiveDate;

    #[test]
    fn format_relative_time_just_now() {
        let now = Utc::now().naive_utc();
        assert_eq!(format_relative_time(&now), "just now");
    }

    #[test]
    fn format_relative_time_minutes() {
        let dt = Utc::now().naive_utc() - chrono::Duration::minutes(5);
        assert_eq!(format_relative_time(&dt), "5m ago");
    }

    #[test]
    fn format_relative_time_hours() {
        let dt = Utc::now().naive_utc() - chrono::Duration::hours(3);
        assert_eq!(format_relative_time(&dt), "3h ago");
    }

    #[test]
    fn format_relative_time_old_date() {
        let dt = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(format_relative_time(&dt), "Jan 15, 2025");
    }

    fn chain(depth: usize) -> Vec<Comment> {
        let mut node: Option<Comment> = None;
        for i in (0..depth).rev() {
            node = Some(Comment {
                id: i.to_string(),
                content: format!("level {i}"),
                author: "ana".into(),
                post_id: "p".into(),
                parent_id: i.checked_sub(1).map(|p| p.to_string()),
                created_at: None,
                replies: node.into_iter().collect(),
            });
        }
        node.into_iter().collect()
    }

    #[test]
    fn comment_indentation_is_capped() {
        let tree = CommentTree::from_forest(chain(9));
        let rendered = comment_tree(&tree);
        let deepest = rendered
            .lines()
            .find(|l| l.contains("(#8)"))
            .unwrap();
        assert!(deepest.starts_with(&"  ".repeat(MAX_INDENT_DEPTH)));
        assert!(deepest.contains("[8]"));
        assert!(!deepest.starts_with(&"  ".repeat(MAX_INDENT_DEPTH + 1)));
    }

    #[test]
    fn empty_thread_has_placeholder() {
        assert_eq!(comment_tree(&CommentTree::new()), "No comments yet.");
    }

    #[test]
    fn page_footer_shows_counts() {
        let page = Page {
            page: 2,
            per_page: 1,
            total: 7,
            items: vec!["x".to_string()],
        };
        let out = super::page(&page, |s| s.clone(), "none");
        assert!(out.ends_with("-- page 2 · 1 per page · 7 total --"));
        assert_eq!(super::page(&Page::<String>::empty(), |s| s.clone(), "none"), "none");
    }

    #[test]
    fn tally_line_marks_vote() {
        let tally = Tally {
            score: 6,
            user_vote: VoteValue::Up,
        };
        assert_eq!(tally_line(&tally), "▲ 6");
    }
}
