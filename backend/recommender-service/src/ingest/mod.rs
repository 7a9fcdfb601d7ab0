use serde::Deserialize;
use std::path::Path;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::models::{BookMetadata, Rating};

#[derive(Debug, Deserialize)]
struct RatingRow {
    user_id: String,
    book_id: String,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct BookRow {
    id: String,
    authors: String,
    original_title: String,
    title: String,
    image_url: String,
}

/// Load raw ratings from CSV with columns `user_id, book_id, rating`.
///
/// Malformed rows are skipped with a warning; an unreadable file is fatal.
pub fn load_ratings(path: &Path) -> Result<Vec<Rating>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::Data(format!("{}: {e}", path.display())))?;

    let mut ratings = Vec::new();
    let mut skipped = 0usize;

    for row in reader.deserialize::<RatingRow>() {
        match row {
            Ok(row) => ratings.push(Rating {
                user_id: row.user_id,
                book_id: row.book_id,
                rating: row.rating,
            }),
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping malformed rating row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, loaded = ratings.len(), "Rating ingestion finished with skipped rows");
    }

    Ok(ratings)
}

/// Load the book catalog from CSV with columns
/// `id, authors, original_title, title, image_url, average_rating`.
///
/// `original_title` is preferred, falling back to `title`. Countries start
/// out unresolved, one slot per comma-separated author, and are filled in
/// by the enrichment batch.
pub fn load_books(path: &Path) -> Result<Vec<BookMetadata>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| AppError::Data(format!("{}: {e}", path.display())))?;

    let mut books = Vec::new();
    let mut skipped = 0usize;

    for row in reader.deserialize::<BookRow>() {
        match row {
            Ok(row) => {
                let title = if row.original_title.trim().is_empty() {
                    row.title
                } else {
                    row.original_title
                };
                let author_slots = row.authors.split(',').count();

                books.push(BookMetadata {
                    id: row.id,
                    authors: row.authors,
                    title,
                    image_url: row.image_url,
                    countries: vec![None; author_slots],
                });
            }
            Err(e) => {
                skipped += 1;
                warn!(error = %e, "Skipping malformed book row");
            }
        }
    }

    if skipped > 0 {
        warn!(skipped, loaded = books.len(), "Book ingestion finished with skipped rows");
    }

    Ok(books)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_ratings_skips_malformed_rows() {
        let file = write_temp(
            "user_id,book_id,rating\n\
             1,10,4.0\n\
             2,11,not-a-number\n\
             3,12,2.5\n",
        );

        let ratings = load_ratings(file.path()).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[0].user_id, "1");
        assert!((ratings[1].rating - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_ratings_missing_file_is_fatal() {
        assert!(load_ratings(Path::new("/nonexistent/ratings.csv")).is_err());
    }

    #[test]
    fn test_load_books_prefers_original_title() {
        let file = write_temp(
            "id,authors,original_title,title,image_url,average_rating\n\
             10,Jane Austen,Pride and Prejudice,Pride and Prejudice (Wordsworth),img1,4.3\n\
             11,\"Haruki Murakami, Jay Rubin\",,Norwegian Wood,img2,4.0\n",
        );

        let books = load_books(file.path()).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(books[0].title, "Pride and Prejudice");
        assert_eq!(books[1].title, "Norwegian Wood");
        assert_eq!(books[1].countries.len(), 2);
        assert!(books[1].countries.iter().all(Option::is_none));
    }
}
