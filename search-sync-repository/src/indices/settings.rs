//! Engine settings shared by every index.

use serde_json::{json, Value};

/// Get the default engine settings for an index.
///
/// The configuration includes:
/// - **custom_analyzer**: standard tokenizer with lowercase and ASCII folding, for names
/// - **autocomplete**: standard tokenizer with an ngram filter (1..20), for prefix search
/// - **max_ngram_diff**: 19, so the autocomplete ngram range is accepted
/// - **max_result_window**: 10000
/// - **query cache**: enabled
///
/// # Sharding Configuration
///
/// - 1 replica for redundancy
///
/// The primary shard count is deliberately absent: it cannot be changed on an
/// existing index, and these settings are re-applied on every startup.
pub fn default_settings() -> Value {
    json!({
        "max_ngram_diff": 19,
        "index": {
            "max_result_window": 10000,
            "queries": {
                "cache": { "enabled": true }
            }
        },
        "analysis": {
            "analyzer": {
                "custom_analyzer": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "asciifolding"]
                },
                "autocomplete": {
                    "type": "custom",
                    "tokenizer": "standard",
                    "filter": ["lowercase", "autocomplete_filter"]
                }
            },
            "filter": {
                "autocomplete_filter": {
                    "type": "ngram",
                    "min_gram": "1",
                    "max_gram": "20"
                }
            }
        },
        "number_of_replicas": "1"
    })
}
