use serde::Serialize;
use uuid::Uuid;

use crate::{
    constants::{DUEL_QUESTION_COUNT, DUEL_STATUS_CHALLENGER_COMPLETED, DUEL_STATUS_COMPLETED},
    db::{ContentStore, DuelCompletion, DuelStore, NewDuel},
    error::{AppError, Result},
    models::{DuelListRow, GameItem, PinnedQuestion, SubmittedQuestion},
};

use super::content_selector::ContentSelector;

/// Owns the duel state machine:
///
/// ```text
/// [none] --create_and_play--> challenger_completed --submit_result--> completed
/// ```
///
/// There is no separate invite step; by the time create_and_play is called
/// the challenger has already played, so a fresh duel starts in
/// `challenger_completed` with the question sequence pinned.
pub struct DuelService<S> {
    store: S,
}

#[derive(Debug)]
pub struct CreateDuelInput {
    pub challenged_id: Option<Uuid>,
    pub difficulty_level: Option<i32>,
    pub challenger_score: Option<i32>,
    pub challenger_time_taken: Option<i32>,
    pub challenger_answers: Option<serde_json::Value>,
    pub questions: Vec<SubmittedQuestion>,
}

#[derive(Debug)]
pub struct DuelCreated {
    pub duel_id: Uuid,
    pub difficulty_level: i32,
    pub challenger_score: i32,
    pub questions: Vec<GameItem>,
}

#[derive(Debug)]
pub struct SubmitResultInput {
    pub score: Option<i32>,
    pub time_taken: Option<i32>,
    pub answers: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct DuelOutcome {
    pub duel_id: Uuid,
    pub your_score: i32,
    pub challenger_score: i32,
    pub winner_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DuelBuckets {
    pub incoming: Vec<DuelListRow>,
    pub outgoing: Vec<DuelListRow>,
    pub completed: Vec<DuelListRow>,
}

impl<S: DuelStore> DuelService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_and_play<C: ContentStore>(
        &self,
        challenger_id: Uuid,
        input: CreateDuelInput,
        selector: &ContentSelector<C>,
    ) -> Result<DuelCreated> {
        let missing = || AppError::BadRequest("Missing required duel parameters".to_string());
        let challenged_id = input.challenged_id.ok_or_else(missing)?;
        let difficulty_level = input.difficulty_level.ok_or_else(missing)?;
        let challenger_score = input.challenger_score.ok_or_else(missing)?;
        let challenger_time_taken = input.challenger_time_taken.ok_or_else(missing)?;
        if input.challenger_answers.is_none() {
            return Err(missing());
        }

        if challenger_id == challenged_id {
            return Err(AppError::BadRequest("Cannot challenge yourself".to_string()));
        }
        if !(0..=5).contains(&difficulty_level) {
            return Err(AppError::BadRequest(
                "Invalid difficulty level. Must be 0-5.".to_string(),
            ));
        }

        // Prefer the questions the challenger's client already played so the
        // pinned sequence cannot diverge from what was shown; draw
        // server-side only for thin clients.
        let questions: Vec<GameItem> = if input.questions.len() >= DUEL_QUESTION_COUNT {
            input
                .questions
                .into_iter()
                .take(DUEL_QUESTION_COUNT)
                .map(SubmittedQuestion::into_item)
                .collect()
        } else {
            tracing::debug!(
                supplied = input.questions.len(),
                "client questions insufficient, drawing server-side"
            );
            let batch = selector
                .pick_batch(difficulty_level, DUEL_QUESTION_COUNT)
                .await?;
            if batch.len() < DUEL_QUESTION_COUNT {
                return Err(AppError::InsufficientContent(format!(
                    "found {} of {} questions for difficulty level {}",
                    batch.len(),
                    DUEL_QUESTION_COUNT,
                    difficulty_level
                )));
            }
            batch
        };

        let duel = NewDuel {
            id: Uuid::new_v4(),
            challenger_id,
            challenged_id,
            difficulty_level,
            challenger_score,
            challenger_time_taken,
        };
        let item_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let duel_id = self.store.create_duel_with_questions(&duel, &item_ids).await?;

        tracing::info!(%duel_id, %challenger_id, %challenged_id, difficulty_level, "duel created");

        Ok(DuelCreated {
            duel_id,
            difficulty_level,
            challenger_score,
            questions,
        })
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<DuelBuckets> {
        let duels = self.store.list_duels_for_user(user_id).await?;
        Ok(partition_duels(user_id, duels))
    }

    /// The pinned sequence for one of the requester's duels. The challenged
    /// player is additionally gated on the challenger having finished, even
    /// though creation makes that structurally true today.
    pub async fn get_questions(&self, duel_id: Uuid, user_id: Uuid) -> Result<Vec<PinnedQuestion>> {
        let duel = self
            .store
            .get_duel(duel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Duel not found".to_string()))?;

        if user_id != duel.challenger_id && user_id != duel.challenged_id {
            return Err(AppError::Forbidden(
                "You are not authorized to access this duel".to_string(),
            ));
        }
        if user_id == duel.challenged_id && duel.status != DUEL_STATUS_CHALLENGER_COMPLETED {
            return Err(AppError::BadRequest(
                "Challenger has not completed this duel yet".to_string(),
            ));
        }

        let questions = self.store.fetch_duel_questions(duel_id).await?;
        if questions.is_empty() {
            return Err(AppError::NotFound(
                "No questions found for this duel".to_string(),
            ));
        }
        Ok(questions)
    }

    /// The pinned sequence without party checks, for the preview endpoint's
    /// existing-duel path.
    pub async fn pinned_questions(&self, duel_id: Uuid) -> Result<Vec<PinnedQuestion>> {
        let questions = self.store.fetch_duel_questions(duel_id).await?;
        if questions.is_empty() {
            return Err(AppError::NotFound(
                "No questions found for this duel".to_string(),
            ));
        }
        Ok(questions)
    }

    pub async fn submit_result(
        &self,
        duel_id: Uuid,
        user_id: Uuid,
        input: SubmitResultInput,
    ) -> Result<DuelOutcome> {
        let missing = || AppError::BadRequest("Missing required result parameters".to_string());
        let score = input.score.ok_or_else(missing)?;
        let time_taken = input.time_taken.ok_or_else(missing)?;
        if input.answers.is_none() {
            return Err(missing());
        }

        let duel = self
            .store
            .get_duel(duel_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Duel not found".to_string()))?;

        if user_id != duel.challenged_id {
            return Err(AppError::Forbidden(
                "You are not the challenged player for this duel".to_string(),
            ));
        }
        if duel.status != DUEL_STATUS_CHALLENGER_COMPLETED {
            return Err(AppError::StateConflict(
                "Duel is not awaiting a result".to_string(),
            ));
        }

        let challenger_score = duel
            .challenger_score
            .ok_or_else(|| AppError::Internal("duel row missing challenger score".to_string()))?;
        let challenger_time = duel.challenger_time_taken.ok_or_else(|| {
            AppError::Internal("duel row missing challenger time taken".to_string())
        })?;

        let winner_id = decide_winner(
            duel.challenger_id,
            duel.challenged_id,
            challenger_score,
            challenger_time,
            score,
            time_taken,
        );

        let completion = DuelCompletion {
            challenged_score: score,
            challenged_time_taken: time_taken,
            winner_id,
        };
        // The store re-checks the status inside the update; a racing
        // duplicate submission loses here rather than overwriting.
        let updated = self.store.complete_duel(duel_id, &completion).await?;
        if !updated {
            return Err(AppError::StateConflict(
                "Duel is not awaiting a result".to_string(),
            ));
        }

        tracing::info!(%duel_id, winner = ?winner_id, "duel completed");

        Ok(DuelOutcome {
            duel_id,
            your_score: score,
            challenger_score,
            winner_id,
        })
    }
}

/// Winner of a finished duel: higher score, then lower time, then a draw
/// (`None`). A draw is a legal terminal outcome, not an error.
pub fn decide_winner(
    challenger_id: Uuid,
    challenged_id: Uuid,
    challenger_score: i32,
    challenger_time: i32,
    challenged_score: i32,
    challenged_time: i32,
) -> Option<Uuid> {
    if challenger_score > challenged_score {
        return Some(challenger_id);
    }
    if challenged_score > challenger_score {
        return Some(challenged_id);
    }
    if challenger_time < challenged_time {
        return Some(challenger_id);
    }
    if challenged_time < challenger_time {
        return Some(challenged_id);
    }
    None
}

pub fn partition_duels(user_id: Uuid, duels: Vec<DuelListRow>) -> DuelBuckets {
    let mut buckets = DuelBuckets {
        incoming: Vec::new(),
        outgoing: Vec::new(),
        completed: Vec::new(),
    };

    for duel in duels {
        if duel.status == DUEL_STATUS_COMPLETED {
            buckets.completed.push(duel);
        } else if duel.status == DUEL_STATUS_CHALLENGER_COMPLETED {
            if duel.challenger_id == user_id {
                buckets.outgoing.push(duel);
            } else if duel.challenged_id == user_id {
                buckets.incoming.push(duel);
            }
        }
        // 'pending' rows (challenger has not played) are never produced by
        // the current flow and stay out of every bucket.
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Duel;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Clone)]
    struct FakeDuelStore {
        duels: Arc<Mutex<HashMap<Uuid, Duel>>>,
        questions: Arc<Mutex<HashMap<Uuid, Vec<PinnedQuestion>>>>,
    }

    impl FakeDuelStore {
        fn new() -> Self {
            Self {
                duels: Arc::new(Mutex::new(HashMap::new())),
                questions: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        fn insert_duel(&self, duel: Duel) {
            self.duels.lock().unwrap().insert(duel.id, duel);
        }

        fn duel_count(&self) -> usize {
            self.duels.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DuelStore for FakeDuelStore {
        async fn create_duel_with_questions(
            &self,
            duel: &NewDuel,
            item_ids: &[i64],
        ) -> Result<Uuid> {
            let row = Duel {
                id: duel.id,
                challenger_id: duel.challenger_id,
                challenged_id: duel.challenged_id,
                difficulty_level: duel.difficulty_level,
                status: DUEL_STATUS_CHALLENGER_COMPLETED.to_string(),
                challenger_score: Some(duel.challenger_score),
                challenger_time_taken: Some(duel.challenger_time_taken),
                challenger_completed_at: Some(Utc::now()),
                challenged_score: None,
                challenged_time_taken: None,
                challenged_completed_at: None,
                winner_id: None,
                created_at: Utc::now(),
            };
            self.duels.lock().unwrap().insert(duel.id, row);

            let pinned = item_ids
                .iter()
                .enumerate()
                .map(|(i, item_id)| PinnedQuestion {
                    duel_question_id: (i + 1) as i64,
                    game_item_id: *item_id,
                    question_order: (i + 1) as i32,
                    game_type_id: 1,
                    category_id: Some(1),
                    level: 1,
                    content: serde_json::json!({}),
                })
                .collect();
            self.questions.lock().unwrap().insert(duel.id, pinned);

            Ok(duel.id)
        }

        async fn get_duel(&self, duel_id: Uuid) -> Result<Option<Duel>> {
            Ok(self.duels.lock().unwrap().get(&duel_id).cloned())
        }

        async fn list_duels_for_user(&self, _user_id: Uuid) -> Result<Vec<DuelListRow>> {
            Ok(Vec::new())
        }

        async fn fetch_duel_questions(&self, duel_id: Uuid) -> Result<Vec<PinnedQuestion>> {
            Ok(self
                .questions
                .lock()
                .unwrap()
                .get(&duel_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn complete_duel(
            &self,
            duel_id: Uuid,
            completion: &DuelCompletion,
        ) -> Result<bool> {
            let mut duels = self.duels.lock().unwrap();
            match duels.get_mut(&duel_id) {
                Some(duel) if duel.status == DUEL_STATUS_CHALLENGER_COMPLETED => {
                    duel.challenged_score = Some(completion.challenged_score);
                    duel.challenged_time_taken = Some(completion.challenged_time_taken);
                    duel.challenged_completed_at = Some(Utc::now());
                    duel.winner_id = completion.winner_id;
                    duel.status = DUEL_STATUS_COMPLETED.to_string();
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    struct FakeContentStore {
        item_count: i64,
    }

    #[async_trait]
    impl ContentStore for FakeContentStore {
        async fn fetch_game_items(
            &self,
            _category_id: Option<i64>,
            _level: Option<i32>,
        ) -> Result<Vec<GameItem>> {
            Ok((1..=self.item_count)
                .map(|id| GameItem {
                    id,
                    game_type_id: 1,
                    category_id: Some(1),
                    level: 2,
                    content: serde_json::json!({"en": "x"}),
                })
                .collect())
        }
    }

    fn selector(item_count: i64) -> ContentSelector<FakeContentStore> {
        ContentSelector::new(FakeContentStore { item_count })
    }

    fn client_questions(count: i64) -> Vec<SubmittedQuestion> {
        (1..=count)
            .map(|id| SubmittedQuestion::Flat(GameItem {
                id,
                game_type_id: 1,
                category_id: Some(1),
                level: 2,
                content: serde_json::json!({"en": "q"}),
            }))
            .collect()
    }

    fn create_input(challenged: Uuid, questions: Vec<SubmittedQuestion>) -> CreateDuelInput {
        CreateDuelInput {
            challenged_id: Some(challenged),
            difficulty_level: Some(2),
            challenger_score: Some(15),
            challenger_time_taken: Some(120),
            challenger_answers: Some(serde_json::json!([])),
            questions,
        }
    }

    fn result_input(score: i32, time_taken: i32) -> SubmitResultInput {
        SubmitResultInput {
            score: Some(score),
            time_taken: Some(time_taken),
            answers: Some(serde_json::json!([])),
        }
    }

    #[test]
    fn higher_score_wins_regardless_of_time() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(decide_winner(a, b, 10, 500, 12, 90), Some(b));
        assert_eq!(decide_winner(a, b, 12, 500, 10, 90), Some(a));
    }

    #[test]
    fn equal_scores_fall_back_to_time() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(decide_winner(a, b, 10, 30, 10, 25), Some(b));
        assert_eq!(decide_winner(a, b, 10, 25, 10, 30), Some(a));
    }

    #[test]
    fn full_tie_is_a_draw() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(decide_winner(a, b, 10, 30, 10, 30), None);
    }

    #[tokio::test]
    async fn self_challenge_is_rejected_without_persisting() {
        let store = FakeDuelStore::new();
        let me = Uuid::new_v4();
        let service = DuelService::new(store.clone());

        let result = service
            .create_and_play(me, create_input(me, client_questions(20)), &selector(0))
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(store.duel_count(), 0);
    }

    #[tokio::test]
    async fn missing_parameters_are_rejected() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());
        let mut input = create_input(Uuid::new_v4(), client_questions(20));
        input.challenger_answers = None;

        let result = service
            .create_and_play(Uuid::new_v4(), input, &selector(0))
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn client_questions_are_pinned_first_twenty_in_order() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());
        let challenger = Uuid::new_v4();

        let created = service
            .create_and_play(
                challenger,
                create_input(Uuid::new_v4(), client_questions(25)),
                &selector(0),
            )
            .await
            .unwrap();

        assert_eq!(created.questions.len(), 20);
        let ids: Vec<i64> = created.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, (1..=20).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn server_side_draw_requires_twenty_questions() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());

        let result = service
            .create_and_play(
                Uuid::new_v4(),
                create_input(Uuid::new_v4(), Vec::new()),
                &selector(5),
            )
            .await;

        assert!(matches!(result, Err(AppError::InsufficientContent(_))));
        assert_eq!(store.duel_count(), 0);
    }

    #[tokio::test]
    async fn server_side_draw_pins_twenty_questions() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());

        let created = service
            .create_and_play(
                Uuid::new_v4(),
                create_input(Uuid::new_v4(), Vec::new()),
                &selector(40),
            )
            .await
            .unwrap();

        assert_eq!(created.questions.len(), 20);
    }

    #[tokio::test]
    async fn pinned_questions_are_stable_across_submission() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());
        let challenger = Uuid::new_v4();
        let challenged = Uuid::new_v4();

        let created = service
            .create_and_play(
                challenger,
                create_input(challenged, client_questions(20)),
                &selector(0),
            )
            .await
            .unwrap();

        let before: Vec<i64> = service
            .get_questions(created.duel_id, challenged)
            .await
            .unwrap()
            .iter()
            .map(|q| q.game_item_id)
            .collect();

        service
            .submit_result(created.duel_id, challenged, result_input(20, 90))
            .await
            .unwrap();

        let after: Vec<i64> = service
            .get_questions(created.duel_id, challenger)
            .await
            .unwrap()
            .iter()
            .map(|q| q.game_item_id)
            .collect();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn outsider_never_sees_questions() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());

        let created = service
            .create_and_play(
                Uuid::new_v4(),
                create_input(Uuid::new_v4(), client_questions(20)),
                &selector(0),
            )
            .await
            .unwrap();

        let result = service.get_questions(created.duel_id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn challenged_is_gated_until_challenger_completes() {
        let store = FakeDuelStore::new();
        let challenger = Uuid::new_v4();
        let challenged = Uuid::new_v4();
        let duel_id = Uuid::new_v4();
        // A pending row cannot be produced through the service; seed it
        // directly to exercise the defense-in-depth gate.
        store.insert_duel(Duel {
            id: duel_id,
            challenger_id: challenger,
            challenged_id: challenged,
            difficulty_level: 2,
            status: crate::constants::DUEL_STATUS_PENDING.to_string(),
            challenger_score: None,
            challenger_time_taken: None,
            challenger_completed_at: None,
            challenged_score: None,
            challenged_time_taken: None,
            challenged_completed_at: None,
            winner_id: None,
            created_at: Utc::now(),
        });

        let service = DuelService::new(store.clone());
        let result = service.get_questions(duel_id, challenged).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn challenged_win_and_duplicate_submission_conflict() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());
        let challenger = Uuid::new_v4();
        let challenged = Uuid::new_v4();

        let created = service
            .create_and_play(
                challenger,
                create_input(challenged, client_questions(20)),
                &selector(0),
            )
            .await
            .unwrap();

        let outcome = service
            .submit_result(created.duel_id, challenged, result_input(20, 90))
            .await
            .unwrap();
        assert_eq!(outcome.winner_id, Some(challenged));
        assert_eq!(outcome.challenger_score, 15);

        let duplicate = service
            .submit_result(created.duel_id, challenged, result_input(20, 90))
            .await;
        assert!(matches!(duplicate, Err(AppError::StateConflict(_))));
    }

    #[tokio::test]
    async fn challenger_cannot_submit_the_result() {
        let store = FakeDuelStore::new();
        let service = DuelService::new(store.clone());
        let challenger = Uuid::new_v4();

        let created = service
            .create_and_play(
                challenger,
                create_input(Uuid::new_v4(), client_questions(20)),
                &selector(0),
            )
            .await
            .unwrap();

        let result = service
            .submit_result(created.duel_id, challenger, result_input(5, 60))
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn partition_buckets_by_role_and_status() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let row = |challenger: Uuid, challenged: Uuid, status: &str| DuelListRow {
            id: Uuid::new_v4(),
            challenger_id: challenger,
            challenged_id: challenged,
            difficulty_level: 1,
            status: status.to_string(),
            challenger_score: Some(1),
            challenged_score: None,
            winner_id: None,
            created_at: Utc::now(),
            challenger_username: "a".to_string(),
            challenger_avatar_url: None,
            challenged_username: "b".to_string(),
            challenged_avatar_url: None,
        };

        let buckets = partition_duels(
            me,
            vec![
                row(me, other, DUEL_STATUS_CHALLENGER_COMPLETED),
                row(other, me, DUEL_STATUS_CHALLENGER_COMPLETED),
                row(other, me, DUEL_STATUS_COMPLETED),
            ],
        );

        assert_eq!(buckets.outgoing.len(), 1);
        assert_eq!(buckets.incoming.len(), 1);
        assert_eq!(buckets.completed.len(), 1);
    }
}
