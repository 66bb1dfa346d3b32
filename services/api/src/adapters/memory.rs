//! services/api/src/adapters/memory.rs
//!
//! An in-process implementation of the `MarketplaceStore` port. It backs the
//! service when `STORE_BACKEND=memory` (local demos) and drives the web tests.
//! Ordering and uniqueness rules mirror the Postgres schema.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use study_market_core::domain::{
    NewNote, NewOrder, NewOrderFile, NewPurchase, Note, NoteStatus, Order, OrderFile,
    OrderStatus, OrderUpdate, OrderWithCustomer, Profile, ProfileUpdate, Purchase,
    PurchasedNote, UserCredentials,
};
use study_market_core::ports::{MarketplaceStore, PortError, PortResult};
use tokio::sync::RwLock;
use uuid::Uuid;

struct Account {
    profile: Profile,
    hashed_password: String,
}

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    auth_sessions: HashMap<String, (Uuid, DateTime<Utc>)>,
    notes: Vec<Note>,
    purchases: Vec<Purchase>,
    wishlists: Vec<(Uuid, Uuid)>,
    orders: Vec<Order>,
    order_files: Vec<OrderFile>,
}

/// A `MarketplaceStore` that keeps every table in memory.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every auth session that has expired by `now`. Returns how many were removed.
    pub async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> usize {
        let mut tables = self.tables.write().await;
        let before = tables.auth_sessions.len();
        tables.auth_sessions.retain(|_, (_, expires_at)| *expires_at > now);
        before - tables.auth_sessions.len()
    }

    /// Grants or revokes the admin flag on an account.
    pub async fn set_admin(&self, user_id: Uuid, is_admin: bool) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))?;
        account.profile.is_admin = is_admin;
        Ok(())
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn create_profile(
        &self,
        email: &str,
        hashed_password: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> PortResult<Profile> {
        let mut tables = self.tables.write().await;
        if tables
            .accounts
            .values()
            .any(|a| a.profile.email.as_deref() == Some(email))
        {
            return Err(PortError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        let profile = Profile {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            first_name: first_name.map(str::to_string),
            last_name: last_name.map(str::to_string),
            grade: None,
            is_admin: false,
            created_at: Utc::now(),
        };
        tables.accounts.insert(
            profile.id,
            Account {
                profile: profile.clone(),
                hashed_password: hashed_password.to_string(),
            },
        );
        Ok(profile)
    }

    async fn get_credentials_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let tables = self.tables.read().await;
        tables
            .accounts
            .values()
            .find(|a| a.profile.email.as_deref() == Some(email))
            .map(|a| UserCredentials {
                user_id: a.profile.id,
                email: email.to_string(),
                hashed_password: a.hashed_password.clone(),
            })
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", email)))
    }

    async fn get_profile(&self, user_id: Uuid) -> PortResult<Profile> {
        let tables = self.tables.read().await;
        tables
            .accounts
            .get(&user_id)
            .map(|a| a.profile.clone())
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> PortResult<Profile> {
        let mut tables = self.tables.write().await;
        let account = tables
            .accounts
            .get_mut(&user_id)
            .ok_or_else(|| PortError::NotFound(format!("Profile {} not found", user_id)))?;
        let profile = &mut account.profile;
        if update.first_name.is_some() {
            profile.first_name = update.first_name;
        }
        if update.last_name.is_some() {
            profile.last_name = update.last_name;
        }
        if update.grade.is_some() {
            profile.grade = update.grade;
        }
        Ok(profile.clone())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .auth_sessions
            .insert(session_id.to_string(), (user_id, expires_at));
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let mut tables = self.tables.write().await;
        match tables.auth_sessions.get(session_id).copied() {
            Some((user_id, expires_at)) if expires_at > Utc::now() => Ok(user_id),
            Some(_) => {
                tables.auth_sessions.remove(session_id);
                Err(PortError::Unauthorized)
            }
            None => Err(PortError::Unauthorized),
        }
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.tables.write().await.auth_sessions.remove(session_id);
        Ok(())
    }

    async fn list_notes_by_status(&self, status: NoteStatus) -> PortResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let mut notes: Vec<Note> = tables
            .notes
            .iter()
            .filter(|n| n.status == status)
            .cloned()
            .collect();
        newest_first(&mut notes, |n| n.created_at);
        Ok(notes)
    }

    async fn list_notes_by_seller(&self, seller_id: Uuid) -> PortResult<Vec<Note>> {
        let tables = self.tables.read().await;
        let mut notes: Vec<Note> = tables
            .notes
            .iter()
            .filter(|n| n.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut notes, |n| n.created_at);
        Ok(notes)
    }

    async fn get_note(&self, note_id: Uuid) -> PortResult<Note> {
        let tables = self.tables.read().await;
        tables
            .notes
            .iter()
            .find(|n| n.id == note_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note_id)))
    }

    async fn insert_note(&self, note: NewNote) -> PortResult<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            seller_id: note.seller_id,
            title: note.title,
            description: note.description,
            subject: note.subject,
            university: note.university,
            course_code: note.course_code,
            professor_name: note.professor_name,
            semester: note.semester,
            year: note.year,
            price: note.price,
            rating: None,
            reviews_count: 0,
            downloads_count: 0,
            content_type: note.content_type,
            preview_available: note.preview_available,
            file_path: note.file_path,
            preview_file_path: note.preview_file_path,
            file_size: note.file_size,
            status: NoteStatus::Active,
            created_at: Utc::now(),
        };
        self.tables.write().await.notes.push(note.clone());
        Ok(note)
    }

    async fn remove_note(&self, note_id: Uuid, seller_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        let note = tables
            .notes
            .iter_mut()
            .find(|n| {
                n.id == note_id && n.seller_id == seller_id && n.status == NoteStatus::Active
            })
            .ok_or_else(|| PortError::NotFound(format!("Note {} not found", note_id)))?;
        note.status = NoteStatus::Removed;
        Ok(())
    }

    async fn insert_purchase(&self, purchase: NewPurchase) -> PortResult<Purchase> {
        let mut tables = self.tables.write().await;
        if tables
            .purchases
            .iter()
            .any(|p| p.buyer_id == purchase.buyer_id && p.note_id == purchase.note_id)
        {
            return Err(PortError::Conflict("Note already purchased".to_string()));
        }
        let purchase = Purchase {
            id: Uuid::new_v4(),
            buyer_id: purchase.buyer_id,
            note_id: purchase.note_id,
            purchase_price: purchase.purchase_price,
            payment_status: purchase.payment_status,
            payment_method_id: purchase.payment_method_id,
            transaction_id: purchase.transaction_id,
            purchased_at: Utc::now(),
        };
        tables.purchases.push(purchase.clone());
        Ok(purchase)
    }

    async fn increment_download_count(&self, note_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(note) = tables.notes.iter_mut().find(|n| n.id == note_id) {
            note.downloads_count += 1;
        }
        Ok(())
    }

    async fn list_purchases_by_buyer(&self, buyer_id: Uuid) -> PortResult<Vec<PurchasedNote>> {
        let tables = self.tables.read().await;
        let mut purchased: Vec<PurchasedNote> = tables
            .purchases
            .iter()
            .filter(|p| p.buyer_id == buyer_id)
            .filter_map(|p| {
                tables
                    .notes
                    .iter()
                    .find(|n| n.id == p.note_id)
                    .map(|note| PurchasedNote {
                        note: note.clone(),
                        purchase_price: p.purchase_price,
                        purchased_at: p.purchased_at,
                    })
            })
            .collect();
        newest_first(&mut purchased, |p| p.purchased_at);
        Ok(purchased)
    }

    async fn has_purchased(&self, buyer_id: Uuid, note_id: Uuid) -> PortResult<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .purchases
            .iter()
            .any(|p| p.buyer_id == buyer_id && p.note_id == note_id))
    }

    async fn list_wishlist(&self, user_id: Uuid) -> PortResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .wishlists
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, n)| *n)
            .collect())
    }

    async fn insert_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.wishlists.contains(&(user_id, note_id)) {
            tables.wishlists.push((user_id, note_id));
        }
        Ok(())
    }

    async fn delete_wishlist_entry(&self, user_id: Uuid, note_id: Uuid) -> PortResult<()> {
        self.tables
            .write()
            .await
            .wishlists
            .retain(|entry| *entry != (user_id, note_id));
        Ok(())
    }

    async fn insert_order(&self, order: NewOrder) -> PortResult<Order> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            subject: order.subject,
            grade: order.grade,
            assignment_type: order.assignment_type,
            title: order.title,
            description: order.description,
            pages: order.pages,
            deadline: order.deadline,
            design_preference: order.design_preference,
            special_instructions: order.special_instructions,
            estimated_price: Some(order.estimated_price),
            estimated_time: Some(order.estimated_time),
            payment_method_id: Some(order.payment_method_id),
            payment_status: Some(order.payment_status),
            transaction_id: Some(order.transaction_id),
            payment_amount: Some(order.payment_amount),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.tables.write().await.orders.push(order.clone());
        Ok(order)
    }

    async fn get_order(&self, order_id: Uuid) -> PortResult<Order> {
        let tables = self.tables.read().await;
        tables
            .orders
            .iter()
            .find(|o| o.id == order_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Order {} not found", order_id)))
    }

    async fn insert_order_file(&self, file: NewOrderFile) -> PortResult<OrderFile> {
        let mut tables = self.tables.write().await;
        if !tables.orders.iter().any(|o| o.id == file.order_id) {
            return Err(PortError::NotFound(format!("Order {} not found", file.order_id)));
        }
        let file = OrderFile {
            id: Uuid::new_v4(),
            order_id: file.order_id,
            file_name: file.file_name,
            file_path: file.file_path,
            file_size: file.file_size,
            file_type: file.file_type,
            created_at: Utc::now(),
        };
        tables.order_files.push(file.clone());
        Ok(file)
    }

    async fn list_orders_by_user(&self, user_id: Uuid) -> PortResult<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut orders, |o| o.created_at);
        Ok(orders)
    }

    async fn list_all_orders(&self) -> PortResult<Vec<OrderWithCustomer>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<OrderWithCustomer> = tables
            .orders
            .iter()
            .filter_map(|o| {
                tables.accounts.get(&o.user_id).map(|a| OrderWithCustomer {
                    order: o.clone(),
                    first_name: a.profile.first_name.clone(),
                    last_name: a.profile.last_name.clone(),
                    email: a.profile.email.clone(),
                })
            })
            .collect();
        newest_first(&mut orders, |o| o.order.created_at);
        Ok(orders)
    }

    async fn update_order(&self, order_id: Uuid, update: OrderUpdate) -> PortResult<Order> {
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| PortError::NotFound(format!("Order {} not found", order_id)))?;
        order.status = update.status;
        order.estimated_price = update.estimated_price;
        order.estimated_time = update.estimated_time;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_note(seller_id: Uuid, title: &str) -> NewNote {
        NewNote {
            seller_id,
            title: title.to_string(),
            description: None,
            subject: "History".to_string(),
            university: "Pune University".to_string(),
            course_code: None,
            professor_name: None,
            semester: None,
            year: None,
            price: 25.0,
            content_type: "pdf".to_string(),
            preview_available: false,
            file_path: format!("{}/main/1.pdf", seller_id),
            preview_file_path: None,
            file_size: Some(3),
        }
    }

    #[tokio::test]
    async fn duplicate_emails_conflict() {
        let store = InMemoryStore::new();
        store.create_profile("a@b.c", "hash", None, None).await.unwrap();
        let err = store.create_profile("a@b.c", "hash", None, None).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict(_)));
    }

    #[tokio::test]
    async fn expired_sessions_are_rejected_and_dropped() {
        let store = InMemoryStore::new();
        let user = Uuid::new_v4();
        store
            .create_auth_session("live", user, Utc::now() + Duration::hours(1))
            .await
            .unwrap();
        store
            .create_auth_session("stale", user, Utc::now() - Duration::hours(1))
            .await
            .unwrap();
        store
            .create_auth_session("forgotten", user, Utc::now() - Duration::minutes(5))
            .await
            .unwrap();

        assert_eq!(store.validate_auth_session("live").await.unwrap(), user);
        assert!(matches!(
            store.validate_auth_session("stale").await,
            Err(PortError::Unauthorized)
        ));
        assert!(!store.tables.read().await.auth_sessions.contains_key("stale"));

        assert_eq!(store.purge_expired_sessions(Utc::now()).await, 1);
        assert_eq!(store.tables.read().await.auth_sessions.len(), 1);

        store.delete_auth_session("live").await.unwrap();
        assert!(store.validate_auth_session("live").await.is_err());
    }

    #[tokio::test]
    async fn purchases_are_unique_and_joined_with_notes() {
        let store = InMemoryStore::new();
        let seller = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        let note = store.insert_note(new_note(seller, "Mughal Empire")).await.unwrap();

        let purchase = NewPurchase {
            buyer_id: buyer,
            note_id: note.id,
            purchase_price: 25.0,
            payment_status: "completed".to_string(),
            payment_method_id: None,
            transaction_id: None,
        };
        store.insert_purchase(purchase.clone()).await.unwrap();
        assert!(matches!(
            store.insert_purchase(purchase).await,
            Err(PortError::Conflict(_))
        ));

        let bought = store.list_purchases_by_buyer(buyer).await.unwrap();
        assert_eq!(bought.len(), 1);
        assert_eq!(bought[0].note.title, "Mughal Empire");
        assert!(store.has_purchased(buyer, note.id).await.unwrap());

        store.increment_download_count(note.id).await.unwrap();
        assert_eq!(store.get_note(note.id).await.unwrap().downloads_count, 1);
    }

    #[tokio::test]
    async fn removed_notes_keep_their_purchases() {
        let store = InMemoryStore::new();
        let seller = Uuid::new_v4();
        let buyer = Uuid::new_v4();
        let note = store.insert_note(new_note(seller, "Maratha Wars")).await.unwrap();
        store
            .insert_purchase(NewPurchase {
                buyer_id: buyer,
                note_id: note.id,
                purchase_price: 25.0,
                payment_status: "completed".to_string(),
                payment_method_id: None,
                transaction_id: None,
            })
            .await
            .unwrap();

        assert!(store.remove_note(note.id, Uuid::new_v4()).await.is_err());
        store.remove_note(note.id, seller).await.unwrap();
        assert!(matches!(
            store.remove_note(note.id, seller).await,
            Err(PortError::NotFound(_))
        ));

        assert_eq!(store.get_note(note.id).await.unwrap().status, NoteStatus::Removed);
        assert!(store.list_notes_by_status(NoteStatus::Active).await.unwrap().is_empty());
        let bought = store.list_purchases_by_buyer(buyer).await.unwrap();
        assert_eq!(bought.len(), 1);
        assert_eq!(bought[0].note.status, NoteStatus::Removed);
        assert!(store.has_purchased(buyer, note.id).await.unwrap());
    }

    #[tokio::test]
    async fn wishlist_entries_are_a_set() {
        let store = InMemoryStore::new();
        let (user, note) = (Uuid::new_v4(), Uuid::new_v4());
        store.insert_wishlist_entry(user, note).await.unwrap();
        store.insert_wishlist_entry(user, note).await.unwrap();
        assert_eq!(store.list_wishlist(user).await.unwrap(), vec![note]);
        store.delete_wishlist_entry(user, note).await.unwrap();
        assert!(store.list_wishlist(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_updates_keep_unset_fields() {
        let store = InMemoryStore::new();
        let profile = store
            .create_profile("p@q.r", "hash", Some("Asha"), Some("Rao"))
            .await
            .unwrap();
        let updated = store
            .update_profile(
                profile.id,
                ProfileUpdate {
                    grade: Some("B.Sc 2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.first_name.as_deref(), Some("Asha"));
        assert_eq!(updated.grade.as_deref(), Some("B.Sc 2"));

        store.set_admin(profile.id, true).await.unwrap();
        assert!(store.get_profile(profile.id).await.unwrap().is_admin);
    }
}
