// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Input Sources
 * In-memory queues and lazily streamed, partitionable wordlists
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use async_trait::async_trait;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::debug;

use crate::errors::DdpResult;

/// Anything that can be probed carries a name the answer is recorded under
pub trait ProbeInput: Send + 'static {
    fn probe_name(&self) -> String;
}

/// A raw word normalized into a structured input
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedInput {
    pub name: String,
}

impl NamedInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl From<&str> for NamedInput {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for NamedInput {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl ProbeInput for NamedInput {
    fn probe_name(&self) -> String {
        self.name.clone()
    }
}

/// Pull-based supply of probe inputs. `Ok(None)` means exhausted.
#[async_trait]
pub trait InputSource<I>: Send {
    async fn next_input(&mut self) -> DdpResult<Option<I>>;
}

/// Inputs held in memory
#[derive(Debug, Clone)]
pub struct VecSource<I> {
    items: VecDeque<I>,
}

impl<I> VecSource<I> {
    pub fn new(items: impl IntoIterator<Item = I>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl VecSource<NamedInput> {
    /// Raw words become named inputs; blank words are dropped
    pub fn from_words<S: AsRef<str>>(words: impl IntoIterator<Item = S>) -> Self {
        Self::new(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_string())
                .filter(|w| !w.is_empty())
                .map(NamedInput::new),
        )
    }
}

#[async_trait]
impl<I: Send> InputSource<I> for VecSource<I> {
    async fn next_input(&mut self) -> DdpResult<Option<I>> {
        Ok(self.items.pop_front())
    }
}

/// Cooperative slice of a shared line source: lines `offset`,
/// `offset + stride`, `offset + 2*stride`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub offset: usize,
    pub stride: usize,
}

impl Default for Partition {
    fn default() -> Self {
        Self {
            offset: 0,
            stride: 1,
        }
    }
}

impl Partition {
    pub fn new(offset: usize, stride: usize) -> Self {
        Self {
            offset,
            stride: stride.max(1),
        }
    }

    /// `n` partitions that together cover every line exactly once
    pub fn split(n: usize) -> Vec<Partition> {
        let n = n.max(1);
        (0..n).map(|offset| Partition::new(offset, n)).collect()
    }
}

type BoxedLines = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Wordlist read lazily, one trimmed non-empty line at a time
pub struct LineSource {
    lines: BoxedLines,
    partition: Partition,
    started: bool,
    exhausted: bool,
    label: String,
}

impl std::fmt::Debug for LineSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("label", &self.label)
            .field("partition", &self.partition)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl LineSource {
    pub async fn open(path: impl AsRef<Path>, partition: Partition) -> DdpResult<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        debug!(
            "[Probe] Streaming {} (offset {}, stride {})",
            path.display(),
            partition.offset,
            partition.stride
        );
        Ok(Self::from_reader(
            BufReader::new(file),
            partition,
            path.display().to_string(),
        ))
    }

    pub fn from_reader<R>(reader: R, partition: Partition, label: impl Into<String>) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let boxed: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(reader);
        Self {
            lines: boxed.lines(),
            partition: Partition::new(partition.offset, partition.stride),
            started: false,
            exhausted: false,
            label: label.into(),
        }
    }

    async fn read_line(&mut self) -> DdpResult<Option<String>> {
        if self.exhausted {
            return Ok(None);
        }
        match self.lines.next_line().await? {
            Some(line) => Ok(Some(line)),
            None => {
                self.exhausted = true;
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl InputSource<NamedInput> for LineSource {
    async fn next_input(&mut self) -> DdpResult<Option<NamedInput>> {
        loop {
            let skip = if self.started {
                self.partition.stride - 1
            } else {
                self.partition.offset
            };
            self.started = true;

            for _ in 0..skip {
                if self.read_line().await?.is_none() {
                    return Ok(None);
                }
            }

            match self.read_line().await? {
                None => return Ok(None),
                Some(line) => {
                    let word = line.trim();
                    if !word.is_empty() {
                        return Ok(Some(NamedInput::new(word)));
                    }
                }
            }
        }
    }
}
