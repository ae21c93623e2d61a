use anyhow::Result;
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::models::page_visit::PageVisit;
use crate::models::visitor::Visitor;

/// Persistence seam for visitors and page visits.
///
/// Implementations must offer a unique point lookup on `Visitor::session_id`
/// and a range scan on `PageVisit::timestamp`. Every write touches a single
/// record; no multi-record transaction is expected.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn find_visitor_by_session(&self, session_id: &str) -> Result<Option<Visitor>>;

    /// Inserts the visitor and returns it with its id assigned.
    async fn insert_visitor(&self, visitor: Visitor) -> Result<Visitor>;

    /// Bumps `last_visit` for an existing visitor.
    async fn touch_visitor(&self, visitor_id: ObjectId, at: i64) -> Result<()>;

    /// Inserts the visit and returns it with its id assigned.
    async fn insert_page_visit(&self, visit: PageVisit) -> Result<PageVisit>;

    /// Most recent visit (by capture timestamp) of `url` by this visitor.
    async fn latest_page_visit(&self, visitor_id: ObjectId, url: &str) -> Result<Option<PageVisit>>;

    /// Most recent visit of `url` by this visitor that has no title yet.
    async fn latest_untitled_page_visit(
        &self,
        visitor_id: ObjectId,
        url: &str,
    ) -> Result<Option<PageVisit>>;

    async fn set_page_title(&self, visit_id: ObjectId, title: &str) -> Result<()>;

    /// Writes duration and bounce classification. Later calls overwrite earlier ones.
    async fn finalize_page_visit(&self, visit_id: ObjectId, duration: i64, bounced: bool)
    -> Result<()>;

    /// Visits captured in `[start, end)`, timestamps in milliseconds.
    async fn page_visits_between(&self, start: i64, end: i64) -> Result<Vec<PageVisit>>;

    async fn visitors_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Visitor>>;

    async fn ping(&self) -> Result<()>;
}
