//! Process-local store implementing every persistence port.
//!
//! All state sits behind one mutex, so each conditional write observes and
//! mutates a consistent snapshot, matching the row-level guarantees of the
//! PostgreSQL adapters. Used when no database is configured and by tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    CanaryRepository, CanaryRepositoryError, LogoUpdate, NotificationPreferencesRepository,
    NotificationPreferencesRepositoryError, SubscriptionRepository, SubscriptionRepositoryError,
    TrustedCanaryRepository, TrustedCanaryRepositoryError, WarrantRepository,
    WarrantRepositoryError,
};
use crate::domain::{
    Canary, CanaryDomain, CanaryId, Document, NotificationPreferences, TrustedCanary, UserId,
    Warrant, WarrantId, WarrantStatement, draft_cutoff,
};

#[derive(Default)]
struct State {
    canaries: HashMap<CanaryId, Canary>,
    deleted_domains: HashSet<String>,
    warrants: HashMap<WarrantId, Warrant>,
    subscriptions: HashMap<CanaryId, Vec<UserId>>,
    trusted: HashMap<(UserId, String), TrustedCanary>,
    preferences: HashMap<UserId, NotificationPreferences>,
}

impl State {
    fn open_draft_mut(
        &mut self,
        warrant_id: &WarrantId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Option<&mut Warrant> {
        self.warrants
            .get_mut(warrant_id)
            .filter(|warrant| warrant.is_open_draft_of(owner, now))
    }
}

/// In-memory implementation of the warrant, canary, subscription, trust,
/// and preference repositories.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use canary_backend::outbound::memory::InMemoryCanaryStore;
///
/// let store = Arc::new(InMemoryCanaryStore::new());
/// assert_eq!(store.warrant_count(), 0);
/// ```
#[derive(Default)]
pub struct InMemoryCanaryStore {
    state: Mutex<State>,
}

impl InMemoryCanaryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the delivery preferences of `user`.
    pub fn set_preferences(&self, user: UserId, preferences: NotificationPreferences) {
        self.lock().preferences.insert(user, preferences);
    }

    /// Number of stored warrants in any state, expired drafts included.
    pub fn warrant_count(&self) -> usize {
        self.lock().warrants.len()
    }

    /// Number of active warrants of `canary_id`.
    pub fn active_count(&self, canary_id: &CanaryId) -> usize {
        self.lock()
            .warrants
            .values()
            .filter(|warrant| &warrant.canary_id == canary_id && warrant.active)
            .count()
    }

    /// Raw lookup ignoring ownership and expiry.
    pub fn warrant(&self, warrant_id: &WarrantId) -> Option<Warrant> {
        self.lock().warrants.get(warrant_id).cloned()
    }
}

#[async_trait]
impl WarrantRepository for InMemoryCanaryStore {
    async fn insert(&self, warrant: &Warrant) -> Result<(), WarrantRepositoryError> {
        self.lock().warrants.insert(warrant.id, warrant.clone());
        Ok(())
    }

    async fn find_open_draft(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        Ok(self
            .lock()
            .open_draft_mut(warrant_id, owner, now)
            .map(|warrant| warrant.clone()))
    }

    async fn append_document(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        document: &Document,
        max_documents: usize,
        now: DateTime<Utc>,
    ) -> Result<bool, WarrantRepositoryError> {
        let mut state = self.lock();
        let Some(draft) = state.open_draft_mut(warrant_id, owner, now) else {
            return Ok(false);
        };
        Ok(draft.attach(document.clone(), max_documents).is_ok())
    }

    async fn publish(
        &self,
        warrant_id: &WarrantId,
        owner: &UserId,
        statement: &WarrantStatement,
        now: DateTime<Utc>,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        let mut state = self.lock();
        let Some(draft) = state.open_draft_mut(warrant_id, owner, now) else {
            return Ok(None);
        };
        if draft.publish(statement.clone()).is_err() {
            return Ok(None);
        }
        let published = draft.clone();
        for sibling in state.warrants.values_mut().filter(|warrant| {
            warrant.canary_id == published.canary_id && warrant.id != published.id
        }) {
            sibling.supersede();
        }
        Ok(Some(published))
    }

    async fn find_published(
        &self,
        canary_id: &CanaryId,
        page: u32,
    ) -> Result<Option<Warrant>, WarrantRepositoryError> {
        let state = self.lock();
        let mut published: Vec<&Warrant> = state
            .warrants
            .values()
            .filter(|warrant| &warrant.canary_id == canary_id && warrant.published)
            .collect();
        published.sort_by(|a, b| b.issued.cmp(&a.issued).then_with(|| b.id.cmp(&a.id)));
        let index = usize::try_from(page).unwrap_or(usize::MAX);
        Ok(published.get(index).map(|warrant| (*warrant).clone()))
    }

    async fn list_overdue(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Warrant>, WarrantRepositoryError> {
        let state = self.lock();
        let mut overdue: Vec<Warrant> = state
            .warrants
            .values()
            .filter(|warrant| warrant.needs_overdue_alert(now))
            .cloned()
            .collect();
        overdue.sort_by_key(|warrant| warrant.next_canary);
        Ok(overdue)
    }

    async fn mark_overdue_notified(
        &self,
        warrant_id: &WarrantId,
    ) -> Result<bool, WarrantRepositoryError> {
        let mut state = self.lock();
        match state.warrants.get_mut(warrant_id) {
            Some(warrant) if warrant.active && !warrant.overdue_notified => {
                warrant.overdue_notified = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired_drafts(
        &self,
        now: DateTime<Utc>,
    ) -> Result<u64, WarrantRepositoryError> {
        let cutoff = draft_cutoff(now);
        let mut state = self.lock();
        let before = state.warrants.len();
        state
            .warrants
            .retain(|_, warrant| warrant.published || warrant.issued > cutoff);
        Ok(u64::try_from(before - state.warrants.len()).unwrap_or(0))
    }
}

#[async_trait]
impl CanaryRepository for InMemoryCanaryStore {
    async fn insert(&self, canary: &Canary) -> Result<(), CanaryRepositoryError> {
        let mut state = self.lock();
        let clash = state.canaries.values().any(|existing| {
            existing.domain == canary.domain
                && (existing.owner == canary.owner
                    || (existing.is_verified() && canary.is_verified()))
        });
        if clash || state.canaries.contains_key(&canary.id) {
            return Err(CanaryRepositoryError::duplicate());
        }
        state.canaries.insert(canary.id, canary.clone());
        Ok(())
    }

    async fn is_domain_taken(
        &self,
        domain: &CanaryDomain,
        requester: &UserId,
    ) -> Result<bool, CanaryRepositoryError> {
        let state = self.lock();
        let registered = state.canaries.values().any(|canary| {
            &canary.domain == domain && (canary.is_verified() || &canary.owner == requester)
        });
        Ok(registered || state.deleted_domains.contains(&domain.fingerprint()))
    }

    async fn find_by_domain(
        &self,
        domain: &CanaryDomain,
    ) -> Result<Option<Canary>, CanaryRepositoryError> {
        let state = self.lock();
        Ok(state
            .canaries
            .values()
            .filter(|canary| &canary.domain == domain)
            .min_by_key(|canary| (!canary.is_verified(), canary.created))
            .cloned())
    }

    async fn find_owned(
        &self,
        domain: &CanaryDomain,
        owner: &UserId,
    ) -> Result<Option<Canary>, CanaryRepositoryError> {
        let state = self.lock();
        Ok(state
            .canaries
            .values()
            .find(|canary| &canary.domain == domain && &canary.owner == owner)
            .cloned())
    }

    async fn find_by_id(&self, id: &CanaryId) -> Result<Option<Canary>, CanaryRepositoryError> {
        Ok(self.lock().canaries.get(id).cloned())
    }

    async fn list_owned(&self, owner: &UserId) -> Result<Vec<Canary>, CanaryRepositoryError> {
        let state = self.lock();
        let mut owned: Vec<Canary> = state
            .canaries
            .values()
            .filter(|canary| &canary.owner == owner)
            .cloned()
            .collect();
        owned.sort_by_key(|canary| (canary.created, canary.id));
        Ok(owned)
    }

    async fn mark_verified(&self, id: &CanaryId) -> Result<bool, CanaryRepositoryError> {
        let mut state = self.lock();
        let Some(domain) = state
            .canaries
            .get(id)
            .filter(|canary| !canary.is_verified())
            .map(|canary| canary.domain.clone())
        else {
            return Ok(false);
        };
        let verified_elsewhere = state
            .canaries
            .values()
            .any(|canary| canary.domain == domain && canary.is_verified());
        if verified_elsewhere {
            return Ok(false);
        }
        if let Some(canary) = state.canaries.get_mut(id) {
            canary.verification.completed = true;
        }
        Ok(true)
    }

    async fn set_logo(
        &self,
        id: &CanaryId,
        file_ref: &str,
    ) -> Result<LogoUpdate, CanaryRepositoryError> {
        let mut state = self.lock();
        Ok(match state.canaries.get_mut(id) {
            Some(canary) => LogoUpdate::Replaced {
                previous: canary.logo.replace(file_ref.to_owned()),
            },
            None => LogoUpdate::Missing,
        })
    }

    async fn delete(&self, canary: &Canary) -> Result<(), CanaryRepositoryError> {
        let mut state = self.lock();
        state.canaries.remove(&canary.id);
        state
            .warrants
            .retain(|_, warrant| warrant.canary_id != canary.id);
        state.subscriptions.remove(&canary.id);
        state.deleted_domains.insert(canary.domain.fingerprint());
        Ok(())
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryCanaryStore {
    async fn subscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError> {
        let mut state = self.lock();
        let subscribers = state.subscriptions.entry(*canary_id).or_default();
        if !subscribers.contains(subscriber) {
            subscribers.push(subscriber.clone());
        }
        Ok(())
    }

    async fn unsubscribe(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<(), SubscriptionRepositoryError> {
        if let Some(subscribers) = self.lock().subscriptions.get_mut(canary_id) {
            subscribers.retain(|existing| existing != subscriber);
        }
        Ok(())
    }

    async fn is_subscribed(
        &self,
        subscriber: &UserId,
        canary_id: &CanaryId,
    ) -> Result<bool, SubscriptionRepositoryError> {
        Ok(self
            .lock()
            .subscriptions
            .get(canary_id)
            .is_some_and(|subscribers| subscribers.contains(subscriber)))
    }

    async fn list_subscribers(
        &self,
        canary_id: &CanaryId,
    ) -> Result<Vec<UserId>, SubscriptionRepositoryError> {
        Ok(self
            .lock()
            .subscriptions
            .get(canary_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl TrustedCanaryRepository for InMemoryCanaryStore {
    async fn insert(&self, trusted: &TrustedCanary) -> Result<bool, TrustedCanaryRepositoryError> {
        let key = (trusted.user.clone(), trusted.domain.as_str().to_owned());
        let mut state = self.lock();
        if state.trusted.contains_key(&key) {
            return Ok(false);
        }
        state.trusted.insert(key, trusted.clone());
        Ok(true)
    }

    async fn find(
        &self,
        user: &UserId,
        domain: &CanaryDomain,
    ) -> Result<Option<TrustedCanary>, TrustedCanaryRepositoryError> {
        let key = (user.clone(), domain.as_str().to_owned());
        Ok(self.lock().trusted.get(&key).cloned())
    }

    async fn list(&self, user: &UserId) -> Result<Vec<TrustedCanary>, TrustedCanaryRepositoryError> {
        let mut anchors: Vec<TrustedCanary> = self
            .lock()
            .trusted
            .values()
            .filter(|trusted| &trusted.user == user)
            .cloned()
            .collect();
        anchors.sort_by(|a, b| a.domain.as_str().cmp(b.domain.as_str()));
        Ok(anchors)
    }
}

#[async_trait]
impl NotificationPreferencesRepository for InMemoryCanaryStore {
    async fn find_for_user(
        &self,
        user: &UserId,
    ) -> Result<Option<NotificationPreferences>, NotificationPreferencesRepositoryError> {
        Ok(self.lock().preferences.get(user).cloned())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
