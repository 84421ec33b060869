//! Engine assembly
//!
//! Builds the full serving stack from [`Settings`]: vector store, the
//! startup corpus scroll feeding BM25, embedder selection by provider
//! precedence (Jina > NVIDIA > self-hosted), optional reranker, the
//! knowledge graph snapshot, the LLM (single provider or fallback
//! chain), and finally the wired [`LegalRagChain`]. Everything built
//! here is read-only for the lifetime of the process; requests only
//! mutate their own scratch state.

use std::path::Path;
use std::sync::Arc;

use omnilex_config::{EmbeddingProvider, Settings};
use omnilex_core::Error;
use omnilex_kg::{load_graph, LegalKnowledgeGraph};
use omnilex_llm::{FallbackChain, LlmBackend, NimChatClient, NimConfig};
use omnilex_rag::{
    Embedder, HashEmbedder, HttpReranker, HybridRetriever, JinaEmbedder, NimEmbedder,
    ParentChildRetriever, RerankerConfig, SparseCorpus, VectorStore, VectorStoreConfig,
};

use crate::chain::LegalRagChain;

const SCROLL_BATCH_SIZE: usize = 256;

/// Select the embedder by configured provider precedence.
pub fn build_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>, Error> {
    let embedding = &settings.embedding;
    match embedding.provider() {
        EmbeddingProvider::Jina => {
            let api_key = embedding.jina_api_key.clone().unwrap_or_default();
            let embedder =
                JinaEmbedder::with_model(api_key, &embedding.jina_model, embedding.dimensions)?;
            Ok(Arc::new(embedder))
        }
        EmbeddingProvider::Nvidia => {
            let api_key = embedding.nvidia_api_key.clone().unwrap_or_default();
            Ok(Arc::new(NimEmbedder::new(api_key)?))
        }
        EmbeddingProvider::Local => {
            tracing::warn!("No HTTP embedding provider configured, using self-hosted fallback");
            Ok(Arc::new(HashEmbedder::new()))
        }
    }
}

/// Build the LLM backend: the primary provider, optionally wrapped in a
/// fallback chain. Providers without credentials are skipped with a
/// warning; at least one must remain.
pub fn build_llm(settings: &Settings) -> Result<Arc<dyn LlmBackend>, Error> {
    let build_provider = |name: &str| -> Option<Arc<dyn LlmBackend>> {
        match name {
            "nvidia" => {
                let api_key = std::env::var("NVIDIA_API_KEY").unwrap_or_default();
                let mut config = NimConfig::new(api_key);
                if let Some(ref model) = settings.llm.model {
                    config = config.with_model(model.clone());
                }
                match NimChatClient::new(config) {
                    Ok(client) => Some(Arc::new(client)),
                    Err(e) => {
                        tracing::warn!(provider = name, error = %e, "Skipping provider");
                        None
                    }
                }
            }
            other => {
                tracing::warn!(provider = other, "Unknown LLM provider, skipping");
                None
            }
        }
    };

    if !settings.llm.use_fallback {
        return build_provider(&settings.llm.provider)
            .ok_or_else(|| Error::Config(format!("LLM provider '{}' unavailable", settings.llm.provider)));
    }

    let mut order = vec![settings.llm.provider.clone()];
    for name in &settings.llm.fallback_providers {
        if !order.contains(name) {
            order.push(name.clone());
        }
    }

    let providers: Vec<(String, Arc<dyn LlmBackend>)> = order
        .into_iter()
        .filter_map(|name| build_provider(&name).map(|backend| (name, backend)))
        .collect();

    let chain = FallbackChain::new(providers).map_err(|e| Error::Llm(e.to_string()))?;
    Ok(Arc::new(chain))
}

/// Build the complete serving chain from settings.
///
/// Performs the startup I/O: a full corpus scroll for BM25, the KG
/// snapshot load, and the optional parent store. Missing optional
/// pieces (reranker, KG, parent store) degrade with a warning.
pub async fn build_chain(settings: &Settings) -> Result<LegalRagChain, Error> {
    let embedder = build_embedder(settings)?;

    let vector_store = Arc::new(VectorStore::new(VectorStoreConfig {
        url: settings.vector_store.url.clone(),
        api_key: settings.vector_store.api_key.clone(),
        collection: settings.vector_store.collection.clone(),
        vector_dim: embedder.dimension(),
    })?);

    // BM25 corpus from a one-time scroll of all payloads
    let chunks = vector_store.scroll_all(SCROLL_BATCH_SIZE).await?;
    let corpus = Arc::new(SparseCorpus::build(chunks));

    let mut retriever = HybridRetriever::new(embedder, vector_store).with_corpus(corpus);

    if settings.reranker.enabled {
        let api_key = settings.reranker.api_key.clone().unwrap_or_default();
        match HttpReranker::new(RerankerConfig {
            url: settings.reranker.url.clone(),
            model: settings.reranker.model.clone(),
            api_key,
            ..RerankerConfig::new(String::new())
        }) {
            Ok(reranker) => retriever = retriever.with_reranker(Arc::new(reranker)),
            Err(e) => {
                tracing::warn!(error = %e, "Reranker unavailable, continuing without re-ranking");
            }
        }
    }

    match load_knowledge_graph(Path::new(&settings.kg.graph_path)) {
        Some(graph) if settings.kg.boost_enabled => {
            retriever = retriever.with_knowledge_graph(Arc::new(graph));
        }
        Some(_) => tracing::info!("Knowledge graph loaded but boosting disabled"),
        None => {}
    }

    let llm = build_llm(settings)?;

    let parent_store_path = Path::new(&settings.kg.graph_path)
        .parent()
        .map(|dir| dir.join("parent_store.json"));
    let parent_child = match parent_store_path {
        Some(ref path) if path.exists() => match ParentChildRetriever::from_json_file(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(error = %e, "Parent store unreadable, parent-child disabled");
                ParentChildRetriever::new(Default::default())
            }
        },
        _ => {
            tracing::warn!("Parent store not found, parent-child retrieval disabled");
            ParentChildRetriever::new(Default::default())
        }
    };

    Ok(LegalRagChain::new(
        Arc::new(retriever),
        llm,
        parent_child,
        settings.retrieval.top_k,
    ))
}

fn load_knowledge_graph(path: &Path) -> Option<LegalKnowledgeGraph> {
    if !path.exists() {
        tracing::warn!(path = %path.display(), "Knowledge graph snapshot not found");
        return None;
    }
    match load_graph(path) {
        Ok(graph) => {
            let stats = graph.get_stats();
            tracing::info!(
                nodes = stats.total_nodes,
                edges = stats.total_edges,
                "Knowledge graph loaded"
            );
            Some(graph)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Knowledge graph load failed, boosting disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_embedder_fallback() {
        let mut settings = Settings::default();
        settings.embedding.use_jina = false;
        settings.embedding.use_nvidia = false;
        settings.embedding.jina_api_key = None;
        settings.embedding.nvidia_api_key = None;

        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(embedder.dimension(), 384);
    }

    #[test]
    fn test_jina_selected_when_keyed() {
        let mut settings = Settings::default();
        settings.embedding.use_jina = true;
        settings.embedding.jina_api_key = Some("key".to_string());

        let embedder = build_embedder(&settings).unwrap();
        assert_eq!(embedder.dimension(), settings.embedding.dimensions);
    }

    #[test]
    fn test_missing_kg_snapshot() {
        assert!(load_knowledge_graph(Path::new("/nonexistent/kg.json")).is_none());
    }
}
