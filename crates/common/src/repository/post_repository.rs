//! Loads the post archive CSV: `post_id,url,timestamp,content,log_type`, no
//! header, `content` HTML-entity-decoded. Derives authorship from `url` by
//! matching against the `twitter.com|x.com/<author>/status/<post_id>` shape.

use crate::domain::Post;
use crate::errors::{AppError, Result};
use regex_lite::Regex;
use std::collections::HashMap;
use std::path::Path;

/// A compiled-once view over the CSV archive: posts, derived authorship,
/// and per-author post counts.
pub struct PostRepository {
    posts: HashMap<i64, Post>,
    post_author: HashMap<i64, String>,
    author_post_counts: HashMap<String, usize>,
    author_list: Vec<String>,
}

impl PostRepository {
    pub fn load(csv_path: impl AsRef<Path>) -> Result<Self> {
        let (posts, url_candidates) = load_posts(csv_path.as_ref())?;
        let (post_author, author_post_counts) = derive_authorship(&url_candidates);

        let mut author_list: Vec<String> = author_post_counts.keys().cloned().collect();
        author_list.sort();

        Ok(Self {
            posts,
            post_author,
            author_post_counts,
            author_list,
        })
    }

    pub fn get_post(&self, id: i64) -> Option<&Post> {
        self.posts.get(&id)
    }

    pub fn author_of(&self, id: i64) -> Option<&str> {
        self.post_author.get(&id).map(String::as_str)
    }

    pub fn count_of(&self, author: &str) -> usize {
        self.author_post_counts.get(author).copied().unwrap_or(0)
    }

    pub fn authors(&self) -> &[String] {
        &self.author_list
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values()
    }
}

/// Every row's `(post_id, url, log_type)`, kept independent of the collapsed
/// `Post` map so `derive_authorship` can compare all rows sharing a
/// `post_id`, not just whichever one happened to overwrite the others.
type UrlCandidate = (i64, String, i32);

fn load_posts(csv_path: &Path) -> Result<(HashMap<i64, Post>, Vec<UrlCandidate>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(csv_path)
        .map_err(|e| AppError::CorruptStore {
            message: format!("cannot open csv archive {}: {e}", csv_path.display()),
        })?;

    let mut posts = HashMap::new();
    let mut url_candidates = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::CorruptStore {
            message: format!("malformed csv row: {e}"),
        })?;
        if record.len() < 5 {
            continue;
        }
        let post_id: i64 = record[0].trim_matches('"').parse().map_err(|_| AppError::CorruptStore {
            message: format!("non-integer post_id: {}", &record[0]),
        })?;
        let url = record[1].trim_matches('"').to_string();
        let timestamp = record[2].trim_matches('"').to_string();
        let content = html_escape::decode_html_entities(record[3].trim_matches('"')).into_owned();
        let log_type: i32 = record[4].trim_matches('"').parse().unwrap_or(0);

        url_candidates.push((post_id, url.clone(), log_type));

        posts.insert(
            post_id,
            Post {
                post_id,
                url,
                timestamp,
                content,
                log_type,
                author: None,
            },
        );
    }
    Ok((posts, url_candidates))
}

/// Author is extracted per post from its own URL, with log-type precedence
/// when duplicate post ids somehow disagree (the source CSV is append-only,
/// so the row with the largest `log_type` wins regardless of file order).
fn derive_authorship(url_candidates: &[UrlCandidate]) -> (HashMap<i64, String>, HashMap<String, usize>) {
    let url_pattern = Regex::new(r"https?://(?:www\.)?(?:twitter\.com|x\.com)/([^/]+)/status/(\d+)").unwrap();

    let mut winners: HashMap<i64, (String, i32)> = HashMap::new();
    for (post_id, url, log_type) in url_candidates {
        if url.is_empty() {
            continue;
        }
        let Some(caps) = url_pattern.captures(url) else {
            continue;
        };
        let author = caps.get(1).unwrap().as_str();
        let url_post_id = caps.get(2).unwrap().as_str();
        if url_post_id != post_id.to_string() {
            continue;
        }

        match winners.get(post_id) {
            Some((_, existing_log_type)) if *log_type <= *existing_log_type => {}
            _ => {
                winners.insert(*post_id, (author.to_string(), *log_type));
            }
        }
    }

    let mut post_author = HashMap::with_capacity(winners.len());
    let mut author_post_counts: HashMap<String, usize> = HashMap::new();
    for (post_id, (author, _)) in winners {
        *author_post_counts.entry(author.clone()).or_insert(0) += 1;
        post_author.insert(post_id, author);
    }

    (post_author, author_post_counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[&str]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("twilog-posts-test-{}.csv", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        for row in rows {
            writeln!(f, "{row}").unwrap();
        }
        path
    }

    #[test]
    fn loads_posts_and_derives_author() {
        let path = write_csv(&[
            r#"100,https://x.com/alice/status/100,2024-01-01 10:00:00,hello &amp; world,1"#,
            r#"101,https://twitter.com/bob/status/101,2024-01-02 10:00:00,second post,1"#,
        ]);
        let repo = PostRepository::load(&path).unwrap();
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get_post(100).unwrap().content, "hello & world");
        assert_eq!(repo.author_of(100), Some("alice"));
        assert_eq!(repo.author_of(101), Some("bob"));
        assert_eq!(repo.count_of("alice"), 1);
        assert_eq!(repo.authors(), &["alice".to_string(), "bob".to_string()]);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn mismatched_post_id_in_url_is_not_attributed() {
        let path = write_csv(&[r#"200,https://x.com/carol/status/999,2024-01-01 10:00:00,text,1"#]);
        let repo = PostRepository::load(&path).unwrap();
        assert_eq!(repo.author_of(200), None);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn higher_log_type_wins_on_duplicate_post_id() {
        let path = write_csv(&[
            r#"300,https://x.com/dave/status/300,2024-01-01 10:00:00,original,1"#,
            r#"300,https://x.com/erin/status/300,2024-01-01 11:00:00,bookmark copy,3"#,
        ]);
        let repo = PostRepository::load(&path).unwrap();
        assert_eq!(repo.author_of(300), Some("erin"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn higher_log_type_wins_even_when_listed_first() {
        let path = write_csv(&[
            r#"301,https://x.com/erin/status/301,2024-01-01 11:00:00,bookmark copy,3"#,
            r#"301,https://x.com/dave/status/301,2024-01-01 10:00:00,original,1"#,
        ]);
        let repo = PostRepository::load(&path).unwrap();
        assert_eq!(repo.author_of(301), Some("erin"));
        std::fs::remove_file(&path).ok();
    }
}
