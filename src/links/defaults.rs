//! Built-in links seeded on first launch and on reset

use super::{Link, LinkCategory};

const SEEDS: &[(&str, &str, &str, &str, LinkCategory)] = &[
    ("intra-holberton", "Intra Holberton", "https://intranet.hbtn.io", "🎓", LinkCategory::Education),
    ("github", "GitHub", "https://github.com", "🐙", LinkCategory::Development),
    ("slack", "Slack", "https://slack.com", "💬", LinkCategory::Communication),
    ("stackoverflow", "Stack Overflow", "https://stackoverflow.com", "📚", LinkCategory::Development),
    ("figma", "Figma", "https://figma.com", "🎨", LinkCategory::Design),
    ("notion", "Notion", "https://notion.so", "📝", LinkCategory::Productivity),
    ("gmail", "Gmail", "https://gmail.com", "📧", LinkCategory::Communication),
    ("youtube", "YouTube", "https://youtube.com", "📺", LinkCategory::Entertainment),
];

/// Fresh copies of the default links, all protected and unused
pub fn default_links() -> Vec<Link> {
    SEEDS
        .iter()
        .map(|&(id, name, url, icon, category)| Link {
            id: id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            icon: icon.to_string(),
            category,
            is_default: true,
            created_at: None,
            last_used_at: None,
            usage_count: 0,
        })
        .collect()
}

/// Whether `id` names one of the default links
pub fn is_default_id(id: &str) -> bool {
    SEEDS.iter().any(|&(seed_id, ..)| seed_id == id)
}
