use chrono::{Duration, Utc};

use crate::db::models::*;
use crate::db::PantryItemRepository;
use crate::error::{AppError, AppResult};
use crate::AppState;

pub struct PantryService;

impl PantryService {
    fn validate_name(name: &str) -> AppResult<()> {
        if name.trim().is_empty() {
            return Err(AppError::invalid_field("name", "is required"));
        }
        Ok(())
    }

    fn validate_quantity(quantity: f64) -> AppResult<()> {
        if !quantity.is_finite() || quantity < 0.0 {
            return Err(AppError::invalid_field("quantity", "must be zero or greater"));
        }
        Ok(())
    }

    /// Filters for items expiring within `days` from today (UTC).
    pub fn expiring_within(days: i64) -> AppResult<PantryFilters> {
        if days < 0 {
            return Err(AppError::invalid_field("expiring", "must not be negative"));
        }
        let expiring_before = Duration::try_days(days)
            .and_then(|span| Utc::now().date_naive().checked_add_signed(span))
            .ok_or_else(|| AppError::invalid_field("expiring", "is too large"))?;

        Ok(PantryFilters {
            expiring_before: Some(expiring_before),
            ..Default::default()
        })
    }

    pub async fn list(
        state: &AppState,
        user_id: &str,
        filters: PantryFilters,
    ) -> AppResult<Vec<PantryItem>> {
        PantryItemRepository::list(&state.db, user_id, &filters).await
    }

    pub async fn get(state: &AppState, user_id: &str, id: &str) -> AppResult<PantryItem> {
        PantryItemRepository::find_by_id(&state.db, user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pantry item not found".to_string()))
    }

    pub async fn create(
        state: &AppState,
        user_id: &str,
        create: CreatePantryItem,
    ) -> AppResult<PantryItem> {
        Self::validate_name(&create.name)?;
        Self::validate_quantity(create.quantity)?;

        PantryItemRepository::create(&state.db, user_id, create).await
    }

    pub async fn update(
        state: &AppState,
        user_id: &str,
        id: &str,
        update: UpdatePantryItem,
    ) -> AppResult<PantryItem> {
        if let Some(name) = &update.name {
            Self::validate_name(name)?;
        }
        if let Some(quantity) = update.quantity {
            Self::validate_quantity(quantity)?;
        }

        PantryItemRepository::update(&state.db, user_id, id, update)
            .await?
            .ok_or_else(|| AppError::NotFound("Pantry item not found".to_string()))
    }

    /// Create several items at once; one invalid entry rejects the batch.
    pub async fn create_many(
        state: &AppState,
        user_id: &str,
        items: Vec<CreatePantryItem>,
    ) -> AppResult<Vec<PantryItem>> {
        if items.is_empty() {
            return Err(AppError::invalid_field("items", "must not be empty"));
        }
        for (i, item) in items.iter().enumerate() {
            Self::validate_name(&item.name)
                .and_then(|_| Self::validate_quantity(item.quantity))
                .map_err(|e| at_index(i, e))?;
        }

        let created = PantryItemRepository::create_many(&state.db, user_id, items).await?;
        tracing::info!("Added {} pantry items for user {}", created.len(), user_id);
        Ok(created)
    }

    /// Update several items at once. Unknown ids turn the whole batch into a
    /// 404 and nothing is written.
    pub async fn update_many(
        state: &AppState,
        user_id: &str,
        items: Vec<PantryBulkUpdate>,
    ) -> AppResult<Vec<PantryItem>> {
        if items.is_empty() {
            return Err(AppError::invalid_field("items", "must not be empty"));
        }
        for (i, item) in items.iter().enumerate() {
            if let Some(name) = &item.updates.name {
                Self::validate_name(name).map_err(|e| at_index(i, e))?;
            }
            if let Some(quantity) = item.updates.quantity {
                Self::validate_quantity(quantity).map_err(|e| at_index(i, e))?;
            }
        }

        let updates = items.into_iter().map(|i| (i.id, i.updates)).collect();
        PantryItemRepository::update_many(&state.db, user_id, updates)
            .await?
            .ok_or_else(|| AppError::NotFound("Pantry item not found".to_string()))
    }

    pub async fn delete(state: &AppState, user_id: &str, id: &str) -> AppResult<()> {
        if !PantryItemRepository::delete(&state.db, user_id, id).await? {
            return Err(AppError::NotFound("Pantry item not found".to_string()));
        }
        Ok(())
    }

    pub async fn delete_many(state: &AppState, user_id: &str, ids: &[String]) -> AppResult<u64> {
        if ids.is_empty() {
            return Err(AppError::invalid_field("ids", "must not be empty"));
        }
        let removed = PantryItemRepository::delete_many(&state.db, user_id, ids).await?;
        tracing::info!("Removed {} pantry items for user {}", removed, user_id);
        Ok(removed)
    }
}

fn at_index(index: usize, err: AppError) -> AppError {
    match err {
        AppError::InvalidField { field, message } => {
            AppError::invalid_field(format!("items[{}].{}", index, field), message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::services::testing::*;

    fn item(name: &str, quantity: f64) -> CreatePantryItem {
        CreatePantryItem {
            name: name.to_string(),
            quantity,
            unit: "g".to_string(),
            category: None,
            location: StorageLocation::Pantry,
            expiry_date: None,
        }
    }

    #[tokio::test]
    async fn rejects_negative_quantity_and_blank_name() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        for create in [item("Flour", -1.0), item(" ", 1.0)] {
            let err = PantryService::create(&state, &user.id, create).await.unwrap_err();
            assert!(matches!(err, AppError::InvalidField { .. }));
        }
    }

    #[tokio::test]
    async fn expiring_filter_uses_today() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let today = Utc::now().date_naive();

        let mut soon = item("Yogurt", 1.0);
        soon.expiry_date = Some(today + Duration::days(2));
        let mut later = item("Cheese", 1.0);
        later.expiry_date = Some(today + Duration::days(30));
        PantryService::create(&state, &user.id, soon).await.unwrap();
        PantryService::create(&state, &user.id, later).await.unwrap();
        PantryService::create(&state, &user.id, item("Salt", 1.0)).await.unwrap();

        let filters = PantryService::expiring_within(7).unwrap();
        let expiring = PantryService::list(&state, &user.id, filters)
            .await
            .unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].name, "Yogurt");
    }

    #[test]
    fn expiring_window_rejects_out_of_range_days() {
        for days in [-1, 1_000_000_000, i64::MAX] {
            let err = PantryService::expiring_within(days).unwrap_err();
            assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "expiring"));
        }
        assert!(PantryService::expiring_within(0).is_ok());
    }

    #[tokio::test]
    async fn update_of_missing_item_is_not_found() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let err = PantryService::update(&state, &user.id, "nope", UpdatePantryItem::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn bulk_create_validates_every_entry() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;

        let err = PantryService::create_many(&state, &user.id, vec![item("Oats", 1.0), item("", 1.0)])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "items[1].name"));
        assert!(PantryService::list(&state, &user.id, PantryFilters::default())
            .await
            .unwrap()
            .is_empty());

        let created = PantryService::create_many(&state, &user.id, vec![item("Oats", 1.0), item("Honey", 2.0)])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
    }

    #[tokio::test]
    async fn bulk_update_with_unknown_id_writes_nothing() {
        let state = test_state(Arc::new(FakeGoogle::default())).await;
        let user = seed_user(&state, "g-1").await;
        let oats = PantryService::create(&state, &user.id, item("Oats", 1.0)).await.unwrap();
        let restock = UpdatePantryItem {
            quantity: Some(5.0),
            ..Default::default()
        };

        let err = PantryService::update_many(
            &state,
            &user.id,
            vec![
                PantryBulkUpdate {
                    id: oats.id.clone(),
                    updates: restock.clone(),
                },
                PantryBulkUpdate {
                    id: "missing".to_string(),
                    updates: restock.clone(),
                },
            ],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(PantryService::get(&state, &user.id, &oats.id).await.unwrap().quantity, 1.0);

        let err = PantryService::update_many(
            &state,
            &user.id,
            vec![PantryBulkUpdate {
                id: oats.id.clone(),
                updates: UpdatePantryItem {
                    quantity: Some(-2.0),
                    ..Default::default()
                },
            }],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidField { ref field, .. } if field == "items[0].quantity"));

        let updated = PantryService::update_many(
            &state,
            &user.id,
            vec![PantryBulkUpdate {
                id: oats.id.clone(),
                updates: restock,
            }],
        )
        .await
        .unwrap();
        assert_eq!(updated[0].quantity, 5.0);
    }
}
