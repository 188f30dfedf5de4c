//! Relevance pre-filter
//!
//! Drops low-signal posts ("should I buy", "rate my portfolio", build-help
//! threads) before they reach the store. Global exclusion phrases apply
//! everywhere; tracked subreddits add their own keyword and flair rules.

use crate::reddit::ScrapedPost;

/// Exclusion phrases applied to every post regardless of subreddit
const GLOBAL_EXCLUDE_PATTERNS: [&str; 12] = [
    "should i buy",
    "should i sell",
    "what should i buy",
    "help me choose",
    "rate my",
    "my build",
    "is this worth it for me",
    "recommend me",
    "what laptop should i",
    "what phone should i",
    "which should i get",
    "weekly earnings thread",
];

/// Subreddits with dedicated exclusion rules. A closed set so a typo in a
/// rule key is a compile error, not a silently dead filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedSubreddit {
    Investing,
    Stocks,
    Technology,
    Hardware,
    Energy,
    Semiconductors,
    Economics,
}

impl TrackedSubreddit {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "investing" => Some(Self::Investing),
            "stocks" => Some(Self::Stocks),
            "technology" => Some(Self::Technology),
            "hardware" => Some(Self::Hardware),
            "energy" => Some(Self::Energy),
            "semiconductors" => Some(Self::Semiconductors),
            "economics" => Some(Self::Economics),
            _ => None,
        }
    }

    fn exclude_keywords(&self) -> &'static [&'static str] {
        match self {
            Self::Investing => &[
                "should i buy",
                "should i sell",
                "rate my portfolio",
                "what should i do",
                "inherited",
                "windfall",
                "help me decide",
            ],
            Self::Stocks => &[
                "should i buy",
                "should i sell",
                "rate my portfolio",
                "what stock should",
                "help me decide",
            ],
            Self::Technology => &[
                "which should i buy",
                "best phone",
                "best laptop",
                "what should i get",
                "recommend",
                "vs for me",
                "is this worth it for me",
            ],
            Self::Hardware => &[
                "build help",
                "help me build",
                "which gpu",
                "upgrade my",
                "bottleneck",
                "my pc won't",
                "won't boot",
            ],
            Self::Energy => &["save the planet", "climate denial", "political rant"],
            Self::Semiconductors => &["career", "job", "resume", "theoretical", "homework"],
            Self::Economics => &["eli5", "debate", "theory", "opinion"],
        }
    }

    fn exclude_flairs(&self) -> &'static [&'static str] {
        match self {
            Self::Technology => &["AskTechnology", "Review"],
            Self::Hardware => &["Build Help", "Troubleshooting"],
            _ => &[],
        }
    }
}

/// Returns true if the post should be kept.
pub fn is_relevant(post: &ScrapedPost) -> bool {
    let text = format!("{} {}", post.title, post.body).to_lowercase();

    if GLOBAL_EXCLUDE_PATTERNS.iter().any(|p| text.contains(p)) {
        return false;
    }

    let Some(subreddit) = TrackedSubreddit::parse(&post.subreddit) else {
        // Untracked subreddits only get the global rules.
        return true;
    };

    if subreddit.exclude_keywords().iter().any(|p| text.contains(p)) {
        return false;
    }

    if let Some(flair) = &post.flair {
        let flair = flair.trim();
        if subreddit
            .exclude_flairs()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(flair))
        {
            return false;
        }
    }

    true
}

/// Filtering summary for one scrape batch
#[derive(Debug, Clone, PartialEq)]
pub struct FilterStats {
    pub total_posts: usize,
    pub relevant_posts: usize,
    pub filtered_posts: usize,
    pub filter_rate: f64,
}

pub fn filter_stats(posts: &[ScrapedPost]) -> FilterStats {
    let total = posts.len();
    let relevant = posts.iter().filter(|p| is_relevant(p)).count();
    let filtered = total - relevant;
    let filter_rate = if total > 0 {
        (filtered as f64 / total as f64 * 10_000.0).round() / 100.0
    } else {
        0.0
    };
    FilterStats {
        total_posts: total,
        relevant_posts: relevant,
        filtered_posts: filtered,
        filter_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(subreddit: &str, title: &str, flair: Option<&str>) -> ScrapedPost {
        ScrapedPost {
            source_id: "t1".to_string(),
            subreddit: subreddit.to_string(),
            title: title.to_string(),
            body: String::new(),
            author: "tester".to_string(),
            flair: flair.map(String::from),
            upvotes: 100,
            num_comments: 10,
            upvote_ratio: 0.9,
            velocity: 10.0,
            age_hours: 2.0,
            is_quality_signal: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_global_patterns_apply_everywhere() {
        assert!(!is_relevant(&post("wallstreetbets", "Should I buy NVDA calls?", None)));
        assert!(!is_relevant(&post("untracked_sub", "rate my portfolio please", None)));
    }

    #[test]
    fn test_subreddit_keyword_exclusion() {
        assert!(!is_relevant(&post("stocks", "What stock should I pick", None)));
        assert!(!is_relevant(&post("hardware", "GPU bottleneck question", None)));
        assert!(is_relevant(&post("stocks", "NVDA supply chain delays worsen", None)));
    }

    #[test]
    fn test_flair_exclusion_is_case_insensitive() {
        assert!(!is_relevant(&post("hardware", "New GPUs announced", Some("build help"))));
        assert!(is_relevant(&post("hardware", "New GPUs announced", Some("News"))));
    }

    #[test]
    fn test_untracked_subreddit_passes_specific_rules() {
        // "eli5" is only excluded on r/economics.
        assert!(!is_relevant(&post("economics", "ELI5 inflation", None)));
        assert!(is_relevant(&post("wallstreetbets", "eli5 inflation", None)));
    }

    #[test]
    fn test_filter_stats() {
        let posts = vec![
            post("stocks", "should i buy TSLA", None),
            post("stocks", "Tesla demand falling in Europe", None),
        ];
        let stats = filter_stats(&posts);
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.relevant_posts, 1);
        assert_eq!(stats.filtered_posts, 1);
        assert!((stats.filter_rate - 50.0).abs() < f64::EPSILON);
    }
}
