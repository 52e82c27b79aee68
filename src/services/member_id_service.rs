use mongodb::{
    Client, Collection, Database,
    bson::{self, doc, oid::ObjectId, Document},
    options::ReturnDocument,
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, Result};
use crate::models::application::Application;

#[derive(Debug, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    name: String,
    last: i64,
}

pub fn format_member_id(prefix: &str, n: i64) -> String {
    format!("{}-{:04}", prefix, n)
}

// The assignment only matches while no member_id exists, so a concurrent
// accept of the same application cannot reassign one already written.
fn unassigned_filter(application_id: &ObjectId) -> Document {
    doc! { "_id": application_id, "member_id": { "$exists": false } }
}

/// Sequential member-identifier allocator. The counter increment and the
/// assignment to the application happen inside one client-session
/// transaction so concurrent accepts can never share a number.
#[derive(Clone)]
pub struct MemberIdService {
    client: Client,
    db: Database,
    prefix: String,
}

impl MemberIdService {
    pub fn new(client: Client, db: Database, prefix: String) -> Self {
        Self { client, db, prefix }
    }

    /// Idempotent: an application that already carries a member_id keeps it.
    pub async fn allocate(&self, application_id: &ObjectId) -> Result<String> {
        let applications: Collection<Application> = self.db.collection("applications");

        let app = applications
            .find_one(doc! { "_id": application_id })
            .await?
            .ok_or(AppError::NotFound("Application"))?;

        if let Some(existing) = app.member_id {
            return Ok(existing);
        }

        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let counters: Collection<Counter> = self.db.collection("counters");
        let counter = counters
            .find_one_and_update(doc! { "_id": "member_id" }, doc! { "$inc": { "last": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .session(&mut session)
            .await?
            .ok_or_else(|| AppError::internal("Counter upsert returned no document"))?;

        let member_id = format_member_id(&self.prefix, counter.last);
        let now = bson::DateTime::from_millis(chrono::Utc::now().timestamp_millis());

        let assigned = applications
            .update_one(
                unassigned_filter(application_id),
                doc! { "$set": { "member_id": &member_id, "updated_at": now } },
            )
            .session(&mut session)
            .await?;

        if assigned.matched_count == 0 {
            // Lost the race: a concurrent accept assigned one first. Abandon
            // this number and return what is now on the record.
            session.abort_transaction().await?;
            let app = applications
                .find_one(doc! { "_id": application_id })
                .await?
                .ok_or(AppError::NotFound("Application"))?;
            return app
                .member_id
                .ok_or_else(|| AppError::internal("Application has no member_id after concurrent accept"));
        }

        session.commit_transaction().await?;

        Ok(member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_ids_are_prefixed_and_zero_padded() {
        assert_eq!(format_member_id("FP", 1), "FP-0001");
        assert_eq!(format_member_id("FP", 42), "FP-0042");
        assert_eq!(format_member_id("FP", 12345), "FP-12345");
    }

    #[test]
    fn assignment_only_matches_unassigned_applications() {
        let filter = unassigned_filter(&ObjectId::new());
        assert_eq!(
            filter.get_document("member_id").unwrap(),
            &doc! { "$exists": false }
        );
    }

    #[test]
    fn consecutive_numbers_give_distinct_ids() {
        let ids: Vec<String> = (1..=100).map(|n| format_member_id("FP", n)).collect();
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), ids.len());
    }
}
