//! Offline index build
//!
//! Three steps, each usable on its own:
//! 1. clean: `raw_txt/*.txt` → `cleaned_txt/<stem>_clean.txt`
//! 2. chunk: `cleaned_txt/*_clean.txt` → `cleaned_chunks/chunks.jsonl`
//! 3. index: corpus → embeddings → `index.bin` + `chunks_meta.parquet` + `manifest.json`
//!
//! Artifacts are written through temporary files and renamed into place.
//! Record order in the corpus is the insertion order of the index.

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

use crate::chunking::{
    build_segmenter, clean_text, read_corpus, segment_document, write_corpus, CorpusRecord,
};
use crate::config::Config;
use crate::embedding::{embed_batched, Embedder};
use crate::errors::{LexError, Result};
use crate::index::{
    write_atomic, ArtifactPaths, ChunkRecord, ChunkingParams, FlatIndex, Manifest, MetadataStore,
};

/// Summary of an index build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub vectors: usize,
    pub dimension: usize,
    pub model_id: String,
    pub elapsed_ms: u64,
}

/// Runs the offline pipeline for one data directory
pub struct IndexBuilder {
    config: Config,
    show_progress: bool,
}

impl IndexBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            show_progress: false,
        }
    }

    /// Display an embedding progress bar on stderr
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.config.chunks_dir())
    }

    /// Clean every raw text file; returns the number of files written
    pub fn clean_documents(&self) -> Result<usize> {
        let raw_dir = self.config.raw_txt_dir();
        let out_dir = self.config.cleaned_txt_dir();
        let files = sorted_files(&raw_dir, |name| name.ends_with(".txt"))?;
        std::fs::create_dir_all(&out_dir)?;

        for file in &files {
            let stem = file_stem(file)?;
            let cleaned = clean_text(&std::fs::read_to_string(file)?);
            std::fs::write(out_dir.join(format!("{}_clean.txt", stem)), cleaned)?;
        }

        info!(files = files.len(), dir = %out_dir.display(), "Cleaned documents");
        Ok(files.len())
    }

    /// Segment every cleaned file and write the corpus
    pub fn chunk_documents(&self) -> Result<Vec<CorpusRecord>> {
        let cleaned_dir = self.config.cleaned_txt_dir();
        let files = sorted_files(&cleaned_dir, |name| name.ends_with("_clean.txt"))?;
        if files.is_empty() {
            warn!(dir = %cleaned_dir.display(), "No cleaned documents found");
        }

        let segmenter = build_segmenter(&self.config.chunking)?;
        let mut records = Vec::new();

        for file in &files {
            let stem = file_stem(file)?;
            let text = std::fs::read_to_string(file)?;
            let chunks = segment_document(&stem, &text, segmenter.as_ref());
            if chunks.is_empty() {
                warn!(file = %file.display(), strategy = segmenter.name(), "Document produced no chunks");
            }
            records.extend(chunks);
        }

        let paths = self.paths();
        write_atomic(&paths.corpus, |tmp| write_corpus(tmp, &records))?;
        let params = ChunkingParams::from_config(&self.config.chunking);
        write_atomic(&paths.chunking, |tmp| params.persist(tmp))?;
        info!(
            documents = files.len(),
            chunks = records.len(),
            strategy = segmenter.name(),
            "Wrote chunk corpus"
        );
        Ok(records)
    }

    /// Embed the corpus on disk and persist the index artifacts. The
    /// manifest records the settings the corpus was chunked with.
    pub fn build_index(&self, embedder: &dyn Embedder) -> Result<BuildReport> {
        let paths = self.paths();
        let records = read_corpus(&paths.corpus)?;
        let params = match ChunkingParams::load(&paths.chunking)? {
            Some(params) => params,
            None => {
                warn!(
                    path = %paths.chunking.display(),
                    "No chunking settings next to the corpus; recording current configuration"
                );
                ChunkingParams::from_config(&self.config.chunking)
            }
        };
        self.index_records(embedder, records, params)
    }

    /// Embed `records` in order and persist the index artifacts
    pub fn index_records(
        &self,
        embedder: &dyn Embedder,
        records: Vec<CorpusRecord>,
        chunking: ChunkingParams,
    ) -> Result<BuildReport> {
        let started = Instant::now();
        let paths = self.paths();
        let dimension = embedder.dimension();
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();

        info!(
            chunks = texts.len(),
            model = embedder.model_id(),
            dimension,
            "Embedding corpus"
        );

        let progress = self.progress_bar(texts.len() as u64);
        let vectors = embed_batched(
            embedder,
            &texts,
            self.config.embedding.batch_size,
            |done| progress.set_position(done as u64),
        )?;
        progress.finish_and_clear();

        let index = FlatIndex::build(dimension, &vectors)?;
        let metadata =
            MetadataStore::from_records(records.into_iter().map(ChunkRecord::from).collect());
        if index.len() != metadata.len() {
            return Err(LexError::IndexMisaligned {
                index_rows: index.len(),
                metadata_rows: metadata.len(),
            });
        }

        let manifest = Manifest {
            model_id: embedder.model_id().to_string(),
            dimension,
            vector_count: index.len(),
            chunking,
            built_at: Utc::now(),
        };

        write_atomic(&paths.index, |tmp| index.persist(tmp))?;
        write_atomic(&paths.metadata, |tmp| metadata.persist(tmp))?;
        write_atomic(&paths.manifest, |tmp| manifest.persist(tmp))?;

        let report = BuildReport {
            vectors: index.len(),
            dimension,
            model_id: manifest.model_id,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            vectors = report.vectors,
            dimension,
            elapsed_ms = report.elapsed_ms,
            dir = %self.config.chunks_dir().display(),
            "Index written"
        );
        Ok(report)
    }

    /// clean → chunk → index
    pub fn run(&self, embedder: &dyn Embedder) -> Result<BuildReport> {
        self.clean_documents()?;
        let records = self.chunk_documents()?;
        self.index_records(
            embedder,
            records,
            ChunkingParams::from_config(&self.config.chunking),
        )
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} Embedding [{bar:40.cyan/blue}] {pos}/{len} chunks ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        bar
    }
}

/// Files in `dir` whose name passes `keep`, sorted by path
fn sorted_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(LexError::ArtifactMissing(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if path.is_file() && keep(name) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LexError::Config(format!("unusable file name: {}", path.display())))
}
