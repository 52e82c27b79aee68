use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use mongodb::{Collection, Database, bson::doc, bson::oid::ObjectId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::errors::{AppError, Result};
use crate::models::application::Application;
use crate::models::matches::{MemberMatches, SuggestedMatch};

/// Profile snapshot handed to the suggestion collaborator.
#[derive(Debug, Serialize)]
pub struct MemberProfile {
    pub id: String,
    pub member_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub looking_for: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionReply {
    pub id: String,
    pub matches: Vec<SuggestedPeer>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestedPeer {
    pub id: String,
    #[serde(default)]
    pub reason: String,
}

/// Suggestion seam; the real implementation is one call to a hosted
/// generative-model endpoint, tests substitute a canned reply.
#[async_trait]
pub trait MatchSuggester: Send + Sync {
    async fn suggest(&self, profiles: &[MemberProfile]) -> Result<Vec<SuggestionReply>>;
}

pub struct GenerativeApiSuggester {
    api_key: String,
    endpoint: String,
    client: Client,
}

impl GenerativeApiSuggester {
    pub fn new(api_key: String, endpoint: String) -> Self {
        Self {
            api_key,
            endpoint,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl MatchSuggester for GenerativeApiSuggester {
    async fn suggest(&self, profiles: &[MemberProfile]) -> Result<Vec<SuggestionReply>> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "gpt-4o-mini",
                "messages": [
                    {
                        "role": "system",
                        "content": "You match community members for 1:1 introductions. \
                                    Reply with a JSON array only: \
                                    [{\"id\": \"...\", \"matches\": [{\"id\": \"...\", \"reason\": \"...\"}]}]. \
                                    At most 3 matches per member, never the member itself."
                    },
                    {
                        "role": "user",
                        "content": serde_json::to_string(profiles)?
                    }
                ]
            }))
            .send()
            .await
            .map_err(|e| AppError::external_api(format!("Model API error: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::external_api(format!(
                "Model API returned status: {}",
                response.status()
            )));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AppError::external_api("Model reply had no choices"))?;

        let replies: Vec<SuggestionReply> = serde_json::from_str(strip_code_fences(content))
            .map_err(|e| AppError::external_api(format!("Unparseable model reply: {}", e)))?;
        Ok(replies)
    }
}

/// Model replies often arrive wrapped in a markdown code fence.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub struct MatchmakingService {
    db: Database,
    suggester: Arc<dyn MatchSuggester>,
}

impl MatchmakingService {
    pub fn new(db: Database, suggester: Arc<dyn MatchSuggester>) -> Self {
        Self { db, suggester }
    }

    /// One batch run: load every accepted member, fetch suggestions, write
    /// one recommendation document per member. Returns the number of members
    /// that received a list.
    pub async fn run(&self) -> Result<u64> {
        let applications: Collection<Application> = self.db.collection("applications");

        let accepted: Vec<Application> = applications
            .find(doc! { "status": "accepted" })
            .await?
            .try_collect()
            .await?;

        let profiles: Vec<MemberProfile> = accepted
            .iter()
            .filter_map(|app| {
                let oid = app._id?;
                Some(MemberProfile {
                    id: oid.to_hex(),
                    member_id: app.member_id.clone().unwrap_or_default(),
                    name: app.name.clone(),
                    company: app.company.clone(),
                    role: app.role.clone(),
                    bio: app.bio.clone(),
                    interests: app.interests.clone(),
                    looking_for: app.looking_for.clone(),
                })
            })
            .collect();

        if profiles.len() < 2 {
            tracing::info!("Matchmaking skipped: {} accepted member(s)", profiles.len());
            return Ok(0);
        }

        let replies = self.suggester.suggest(&profiles).await?;

        let by_id: HashMap<&str, &MemberProfile> =
            profiles.iter().map(|p| (p.id.as_str(), p)).collect();

        let matches_coll: Collection<MemberMatches> = self.db.collection("member_matches");
        let mut written = 0u64;

        for reply in &replies {
            let Ok(owner) = ObjectId::parse_str(&reply.id) else {
                tracing::warn!("Matchmaking reply for unknown id {:?}, skipping", reply.id);
                continue;
            };

            let matches: Vec<SuggestedMatch> = reply
                .matches
                .iter()
                .filter(|peer| peer.id != reply.id)
                .filter_map(|peer| {
                    let profile = by_id.get(peer.id.as_str())?;
                    Some(SuggestedMatch {
                        application_id: ObjectId::parse_str(&peer.id).ok()?,
                        member_id: profile.member_id.clone(),
                        name: profile.name.clone(),
                        reason: peer.reason.clone(),
                    })
                })
                .collect();

            if matches.is_empty() {
                continue;
            }

            let record = MemberMatches {
                application_id: owner,
                matches,
                generated_at: Utc::now(),
            };

            matches_coll
                .replace_one(doc! { "_id": owner }, &record)
                .upsert(true)
                .await?;
            written += 1;
        }

        tracing::info!("Matchmaking run wrote {} recommendation list(s)", written);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_code_fence() {
        let fenced = "```json\n[{\"id\": \"a\", \"matches\": []}]\n```";
        assert_eq!(strip_code_fences(fenced), "[{\"id\": \"a\", \"matches\": []}]");
    }

    #[test]
    fn strips_bare_code_fence() {
        assert_eq!(strip_code_fences("```\n[]\n```"), "[]");
    }

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(strip_code_fences("  [] "), "[]");
    }
}
