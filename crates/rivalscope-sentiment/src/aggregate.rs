//! Run-level statistics over persisted posts and comments.

use std::collections::HashMap;

use rivalscope_core::{Comment, KeywordCount, Post, SentimentLabel, Statistics};

const TOP_KEYWORDS: usize = 10;

/// Aggregates the posts and comments that were actually stored for a run.
///
/// Comment-derived figures (average score, label percentages, keywords and
/// response rate) are all zero when there are no comments. Post-derived
/// figures are still reported.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_statistics(posts: &[Post], comments: &[Comment]) -> Statistics {
    let total_posts = u32::try_from(posts.len()).unwrap_or(u32::MAX);
    let avg_engagement_rate = if posts.is_empty() {
        0.0
    } else {
        posts.iter().map(|p| p.engagement_rate).sum::<f64>() / posts.len() as f64
    };

    if comments.is_empty() {
        return Statistics {
            total_posts,
            avg_engagement_rate,
            ..Statistics::default()
        };
    }

    let n = comments.len() as f64;
    let percent = |count: usize| count as f64 / n * 100.0;
    let count_label = |label: SentimentLabel| {
        comments
            .iter()
            .filter(|c| c.sentiment.label == label)
            .count()
    };

    Statistics {
        total_posts,
        total_comments: u32::try_from(comments.len()).unwrap_or(u32::MAX),
        avg_sentiment_score: comments.iter().map(|c| c.sentiment.score).sum::<f64>() / n,
        positive_percentage: percent(count_label(SentimentLabel::Positive)),
        neutral_percentage: percent(count_label(SentimentLabel::Neutral)),
        negative_percentage: percent(count_label(SentimentLabel::Negative)),
        top_keywords: top_keywords(comments),
        response_rate: percent(comments.iter().filter(|c| c.is_response_from_brand).count()),
        avg_engagement_rate,
    }
}

/// Ranked by count descending, ties broken by first appearance.
fn top_keywords(comments: &[Comment]) -> Vec<KeywordCount> {
    // keyword -> (count, first-seen rank)
    let mut counts: HashMap<&str, (u32, usize)> = HashMap::new();
    for keyword in comments.iter().flat_map(|c| &c.sentiment.keywords) {
        let keyword = keyword.as_str();
        if keyword.is_empty() {
            continue;
        }
        let next_rank = counts.len();
        counts.entry(keyword).or_insert((0, next_rank)).0 += 1;
    }

    let mut ranked: Vec<(&str, u32, usize)> = counts
        .into_iter()
        .map(|(keyword, (count, rank))| (keyword, count, rank))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(TOP_KEYWORDS)
        .map(|(keyword, count, _)| KeywordCount {
            keyword: keyword.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rivalscope_core::{Platform, SentimentResult};

    use super::*;

    fn comment(label: SentimentLabel, score: f64, keywords: &[&str], brand: bool) -> Comment {
        Comment {
            sentiment: SentimentResult {
                score,
                label,
                explanation: String::new(),
                keywords: keywords.iter().map(ToString::to_string).collect(),
            },
            is_response_from_brand: brand,
            ..Comment::new("someone", "a comment long enough")
        }
    }

    fn post(engagement_rate: f64) -> Post {
        Post {
            engagement_rate,
            ..Post::new(Platform::Instagram, format!("https://x/{engagement_rate}"))
        }
    }

    #[test]
    fn percentages_sum_to_one_hundred() {
        let comments = vec![
            comment(SentimentLabel::Positive, 0.9, &[], false),
            comment(SentimentLabel::Positive, 0.5, &[], false),
            comment(SentimentLabel::Negative, -0.7, &[], false),
        ];
        let stats = compute_statistics(&[post(1.0)], &comments);

        let sum = stats.positive_percentage + stats.neutral_percentage + stats.negative_percentage;
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((stats.positive_percentage - 200.0 / 3.0).abs() < 1e-9);
        assert!((stats.avg_sentiment_score - (0.9 + 0.5 - 0.7) / 3.0).abs() < 1e-9);
        assert_eq!(stats.total_comments, 3);
    }

    #[test]
    fn no_comments_yields_zeroed_comment_figures() {
        let stats = compute_statistics(&[post(2.0), post(4.0)], &[]);
        assert_eq!(stats.total_posts, 2);
        assert_eq!(stats.total_comments, 0);
        assert!(stats.positive_percentage.abs() < f64::EPSILON);
        assert!(stats.neutral_percentage.abs() < f64::EPSILON);
        assert!(stats.negative_percentage.abs() < f64::EPSILON);
        assert!(stats.response_rate.abs() < f64::EPSILON);
        assert!(stats.top_keywords.is_empty());
        assert!((stats.avg_engagement_rate - 3.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_at_all_is_all_zero() {
        assert_eq!(compute_statistics(&[], &[]), Statistics::default());
    }

    #[test]
    fn keywords_rank_by_count_then_first_seen() {
        let comments = vec![
            comment(SentimentLabel::Neutral, 0.0, &["price", "taste"], false),
            comment(SentimentLabel::Neutral, 0.0, &["delivery", "taste"], false),
            comment(SentimentLabel::Neutral, 0.0, &["delivery", "service"], false),
        ];
        let stats = compute_statistics(&[], &comments);
        let ranked: Vec<_> = stats
            .top_keywords
            .iter()
            .map(|k| (k.keyword.as_str(), k.count))
            .collect();
        assert_eq!(
            ranked,
            vec![("taste", 2), ("delivery", 2), ("price", 1), ("service", 1)]
        );
    }

    #[test]
    fn keyword_list_is_capped_at_ten() {
        let words: Vec<String> = (0..15).map(|i| format!("kw{i}")).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let comments = vec![comment(SentimentLabel::Neutral, 0.0, &refs, false)];
        let stats = compute_statistics(&[], &comments);
        assert_eq!(stats.top_keywords.len(), 10);
        assert_eq!(stats.top_keywords[0].keyword, "kw0");
        assert_eq!(stats.top_keywords[9].keyword, "kw9");
    }

    #[test]
    fn response_rate_counts_brand_comments() {
        let comments = vec![
            comment(SentimentLabel::Neutral, 0.0, &[], true),
            comment(SentimentLabel::Neutral, 0.0, &[], false),
            comment(SentimentLabel::Neutral, 0.0, &[], false),
            comment(SentimentLabel::Neutral, 0.0, &[], false),
        ];
        let stats = compute_statistics(&[], &comments);
        assert!((stats.response_rate - 25.0).abs() < 1e-9);
    }
}
