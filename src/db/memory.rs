use anyhow::{Result, bail};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use std::collections::HashSet;
use tokio::sync::RwLock;

use crate::db::store::AnalyticsStore;
use crate::models::page_visit::PageVisit;
use crate::models::visitor::Visitor;

/// Process-local store for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryStore {
    visitors: RwLock<Vec<Visitor>>,
    page_visits: RwLock<Vec<PageVisit>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn visitor_count(&self) -> usize {
        self.visitors.read().await.len()
    }

    pub async fn page_visits(&self) -> Vec<PageVisit> {
        self.page_visits.read().await.clone()
    }
}

fn latest_matching<'a, F>(visits: &'a [PageVisit], predicate: F) -> Option<&'a PageVisit>
where
    F: Fn(&PageVisit) -> bool,
{
    // Ties on timestamp resolve to the later insert
    visits
        .iter()
        .filter(|v| predicate(v))
        .fold(None, |best: Option<&PageVisit>, v| match best {
            Some(b) if b.timestamp > v.timestamp => Some(b),
            _ => Some(v),
        })
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn find_visitor_by_session(&self, session_id: &str) -> Result<Option<Visitor>> {
        let visitors = self.visitors.read().await;
        Ok(visitors.iter().find(|v| v.session_id == session_id).cloned())
    }

    async fn insert_visitor(&self, mut visitor: Visitor) -> Result<Visitor> {
        let mut visitors = self.visitors.write().await;
        if visitors.iter().any(|v| v.session_id == visitor.session_id) {
            bail!("Duplicate session_id {}", visitor.session_id);
        }
        visitor.id = Some(ObjectId::new());
        visitors.push(visitor.clone());
        Ok(visitor)
    }

    async fn touch_visitor(&self, visitor_id: ObjectId, at: i64) -> Result<()> {
        let mut visitors = self.visitors.write().await;
        if let Some(visitor) = visitors.iter_mut().find(|v| v.id == Some(visitor_id)) {
            visitor.last_visit = at;
        }
        Ok(())
    }

    async fn insert_page_visit(&self, mut visit: PageVisit) -> Result<PageVisit> {
        visit.id = Some(ObjectId::new());
        self.page_visits.write().await.push(visit.clone());
        Ok(visit)
    }

    async fn latest_page_visit(&self, visitor_id: ObjectId, url: &str) -> Result<Option<PageVisit>> {
        let visits = self.page_visits.read().await;
        Ok(latest_matching(&visits, |v| v.visitor_id == visitor_id && v.url == url).cloned())
    }

    async fn latest_untitled_page_visit(
        &self,
        visitor_id: ObjectId,
        url: &str,
    ) -> Result<Option<PageVisit>> {
        let visits = self.page_visits.read().await;
        Ok(latest_matching(&visits, |v| {
            v.visitor_id == visitor_id && v.url == url && v.page_title.is_none()
        })
        .cloned())
    }

    async fn set_page_title(&self, visit_id: ObjectId, title: &str) -> Result<()> {
        let mut visits = self.page_visits.write().await;
        if let Some(visit) = visits.iter_mut().find(|v| v.id == Some(visit_id)) {
            visit.page_title = Some(title.to_string());
        }
        Ok(())
    }

    async fn finalize_page_visit(
        &self,
        visit_id: ObjectId,
        duration: i64,
        bounced: bool,
    ) -> Result<()> {
        let mut visits = self.page_visits.write().await;
        if let Some(visit) = visits.iter_mut().find(|v| v.id == Some(visit_id)) {
            visit.duration = Some(duration);
            visit.bounced = bounced;
        }
        Ok(())
    }

    async fn page_visits_between(&self, start: i64, end: i64) -> Result<Vec<PageVisit>> {
        let visits = self.page_visits.read().await;
        Ok(visits
            .iter()
            .filter(|v| v.timestamp >= start && v.timestamp < end)
            .cloned()
            .collect())
    }

    async fn visitors_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Visitor>> {
        let wanted: HashSet<&ObjectId> = ids.iter().collect();
        let visitors = self.visitors.read().await;
        Ok(visitors
            .iter()
            .filter(|v| v.id.as_ref().is_some_and(|id| wanted.contains(id)))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
