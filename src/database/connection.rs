use mongodb::{Client, Database};

pub async fn get_db_client(database_url: &str) -> (Client, Database) {
    let client = Client::with_uri_str(database_url)
        .await
        .expect("Failed to connect to MongoDB");

    let db_name = "founderpass";
    let db = client.database(db_name);

    match db.list_collection_names().await {
        Ok(collections) => {
            tracing::info!("Connected to database: {}", db_name);
            tracing::debug!("Collections found: {:?}", collections);
        }
        Err(e) => {
            tracing::error!("Database '{}' may not exist or is inaccessible: {}", db_name, e);
        }
    }

    (client, db)
}
