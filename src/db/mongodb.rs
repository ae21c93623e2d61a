use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use ::mongodb::bson::{doc, oid::ObjectId};
use ::mongodb::options::IndexOptions;
use ::mongodb::{Client, Collection, Database, IndexModel};

use crate::config::Settings;
use crate::db::store::AnalyticsStore;
use crate::models::page_visit::PageVisit;
use crate::models::visitor::Visitor;

const VISITORS: &str = "visitors";
const PAGE_VISITS: &str = "page_visits";

/// Connect to MongoDB and verify the connection with a ping.
pub async fn get_database(settings: &Settings) -> Result<Database> {
    let uri = settings
        .mongodb_uri
        .as_deref()
        .context("MONGODB_URI not set")?;
    let client = Client::with_uri_str(uri)
        .await
        .context("Failed to create MongoDB client")?;
    let db = client.database(&settings.database_name);

    db.run_command(doc! { "ping": 1 })
        .await
        .context("Failed to ping MongoDB")?;
    log::info!("Connected to MongoDB database {}", settings.database_name);

    Ok(db)
}

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn visitors(&self) -> Collection<Visitor> {
        self.db.collection::<Visitor>(VISITORS)
    }

    fn page_visits(&self) -> Collection<PageVisit> {
        self.db.collection::<PageVisit>(PAGE_VISITS)
    }

    /// Create the indexes the handlers' lookups rely on. Idempotent.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.visitors()
            .create_index(session_index)
            .await
            .context("Failed to create visitors.session_id index")?;

        let visitor_index = IndexModel::builder()
            .keys(doc! { "visitor_id": 1, "url": 1, "timestamp": -1 })
            .build();
        let timestamp_index = IndexModel::builder().keys(doc! { "timestamp": 1 }).build();
        self.page_visits()
            .create_indexes([visitor_index, timestamp_index])
            .await
            .context("Failed to create page_visits indexes")?;

        Ok(())
    }
}

#[async_trait]
impl AnalyticsStore for MongoStore {
    async fn find_visitor_by_session(&self, session_id: &str) -> Result<Option<Visitor>> {
        self.visitors()
            .find_one(doc! { "session_id": session_id })
            .await
            .context("Failed to look up visitor")
    }

    async fn insert_visitor(&self, mut visitor: Visitor) -> Result<Visitor> {
        let result = self
            .visitors()
            .insert_one(&visitor)
            .await
            .context("Failed to insert visitor")?;
        visitor.id = result.inserted_id.as_object_id();
        Ok(visitor)
    }

    async fn touch_visitor(&self, visitor_id: ObjectId, at: i64) -> Result<()> {
        self.visitors()
            .update_one(doc! { "_id": visitor_id }, doc! { "$set": { "last_visit": at } })
            .await
            .context("Failed to update visitor last_visit")?;
        Ok(())
    }

    async fn insert_page_visit(&self, mut visit: PageVisit) -> Result<PageVisit> {
        let result = self
            .page_visits()
            .insert_one(&visit)
            .await
            .context("Failed to insert page visit")?;
        visit.id = result.inserted_id.as_object_id();
        Ok(visit)
    }

    async fn latest_page_visit(&self, visitor_id: ObjectId, url: &str) -> Result<Option<PageVisit>> {
        self.page_visits()
            .find_one(doc! { "visitor_id": visitor_id, "url": url })
            .sort(doc! { "timestamp": -1, "_id": -1 })
            .await
            .context("Failed to look up page visit")
    }

    async fn latest_untitled_page_visit(
        &self,
        visitor_id: ObjectId,
        url: &str,
    ) -> Result<Option<PageVisit>> {
        self.page_visits()
            .find_one(doc! { "visitor_id": visitor_id, "url": url, "page_title": null })
            .sort(doc! { "timestamp": -1, "_id": -1 })
            .await
            .context("Failed to look up untitled page visit")
    }

    async fn set_page_title(&self, visit_id: ObjectId, title: &str) -> Result<()> {
        self.page_visits()
            .update_one(doc! { "_id": visit_id }, doc! { "$set": { "page_title": title } })
            .await
            .context("Failed to update page title")?;
        Ok(())
    }

    async fn finalize_page_visit(
        &self,
        visit_id: ObjectId,
        duration: i64,
        bounced: bool,
    ) -> Result<()> {
        self.page_visits()
            .update_one(
                doc! { "_id": visit_id },
                doc! { "$set": { "duration": duration, "bounced": bounced } },
            )
            .await
            .context("Failed to finalize page visit")?;
        Ok(())
    }

    async fn page_visits_between(&self, start: i64, end: i64) -> Result<Vec<PageVisit>> {
        self.page_visits()
            .find(doc! { "timestamp": { "$gte": start, "$lt": end } })
            .await
            .context("Failed to scan page visits")?
            .try_collect::<Vec<PageVisit>>()
            .await
            .context("Failed to read page visits")
    }

    async fn visitors_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Visitor>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.visitors()
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await
            .context("Failed to load visitors")?
            .try_collect::<Vec<Visitor>>()
            .await
            .context("Failed to read visitors")
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("Database connection failed")?;
        Ok(())
    }
}
