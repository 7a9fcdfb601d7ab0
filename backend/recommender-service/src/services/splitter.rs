use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use tracing::info;

use crate::models::{Rating, SplitOutput};

/// Partition ratings per user into train and test sets.
///
/// Each user's ratings are shuffled and cut positionally at
/// `floor(train_fraction * n)`. Users with fewer than 2 ratings contribute
/// to neither side; they cannot be trained on or evaluated. Users are
/// visited in sorted id order so a seeded RNG reproduces the same split.
pub fn split_ratings<R: Rng>(ratings: &[Rating], train_fraction: f64, rng: &mut R) -> SplitOutput {
    let mut by_user: HashMap<&str, Vec<&Rating>> = HashMap::new();
    for rating in ratings {
        by_user.entry(&rating.user_id).or_default().push(rating);
    }

    let mut user_ids: Vec<&str> = by_user.keys().copied().collect();
    user_ids.sort_unstable();

    let mut output = SplitOutput::default();
    let mut excluded_users = 0usize;

    for user_id in user_ids {
        let mut user_ratings = by_user.remove(user_id).expect("grouped user present");
        if user_ratings.len() < 2 {
            excluded_users += 1;
            continue;
        }

        user_ratings.shuffle(rng);
        let split_idx = (train_fraction * user_ratings.len() as f64).floor() as usize;

        for (idx, rating) in user_ratings.into_iter().enumerate() {
            let record = rating.clone();
            let (list, map) = if idx < split_idx {
                (&mut output.train, &mut output.user_train)
            } else {
                (&mut output.test, &mut output.user_test)
            };
            map.entry(record.user_id.clone())
                .or_default()
                .insert(record.book_id.clone(), record.rating);
            list.push(record);
        }
    }

    info!(
        train = output.train.len(),
        test = output.test.len(),
        users = output.user_train.len(),
        excluded_users,
        "Split ratings"
    );

    output
}
