//! Binary persistence: a 64-byte header, a packed node tape, and a
//! trailing vector payload. `save` writes the whole stream; `load`
//! rebuilds a fully owned, mutable index from it; `view` aliases
//! caller-provided bytes without copying the vector payload, producing
//! a read-only index.
//!
//! The header's literal layout reserves no fields for `M`/`M0`, but
//! the node tape cannot be parsed without them — each level's neighbor
//! block is written at a fixed capacity, not a length-prefixed one.
//! `DESIGN.md` records the resolution: four of the ten reserved header
//! bytes carry `m` and `m0` as little-endian `u16`s.

use std::io::{Cursor, Read, Write};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::graph::{GraphParams, HnswGraph, VectorSource};
use crate::metric::{Metric, MetricKind};
use crate::node::{decode_top_level, encode_top_level, LevelCapacities, Slot};
use crate::scalar::ScalarKind;

use super::options::IndexOptions;
use super::vectors::VectorStore;
use super::{Index, KeyIndex};

const MAGIC: &[u8; 7] = b"usearch";
const HEADER_LEN: usize = 64;

// The crate's own version triple, stamped into every saved header so
// `load`/`view` can reject files from an incompatible future major
// version.
const VERSION_MAJOR: u16 = 0;
const VERSION_MINOR: u16 = 1;
const VERSION_PATCH: u16 = 0;

/// Overrides for knobs the binary format does not persist, passed as
/// `load`/`view`'s optional `limits` parameter. Connectivity (`M`/`M0`)
/// and the scalar/metric kinds always come from the file; these only
/// affect runtime behavior after loading.
#[derive(Debug, Clone, Copy)]
pub struct LoadLimits {
    /// Concurrent callers the reloaded index's scratch pool supports.
    pub max_threads: usize,
    /// Default candidate-set size used during search.
    pub expansion_search: usize,
    /// Candidate-set size used while linking, should the index be
    /// written to again after loading.
    pub expansion_add: usize,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            max_threads: 1,
            expansion_search: 64,
            expansion_add: 128,
        }
    }
}

struct Header {
    metric_kind: MetricKind,
    scalar_kind: ScalarKind,
    count_present: u64,
    count_deleted: u64,
    dimensions: u64,
    multi: bool,
    capacities: LevelCapacities,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..7].copy_from_slice(MAGIC);
        buf[7..9].copy_from_slice(&VERSION_MAJOR.to_le_bytes());
        buf[9..11].copy_from_slice(&VERSION_MINOR.to_le_bytes());
        buf[11..13].copy_from_slice(&VERSION_PATCH.to_le_bytes());
        buf[13..17].copy_from_slice(&self.metric_kind.tag().to_le_bytes());
        buf[17..21].copy_from_slice(&self.scalar_kind.tag().to_le_bytes());
        buf[21..25].copy_from_slice(&0u32.to_le_bytes()); // key_kind: u64 keys only
        buf[25..29].copy_from_slice(&0u32.to_le_bytes()); // slot_kind: u32 slots only
        buf[29..37].copy_from_slice(&self.count_present.to_le_bytes());
        buf[37..45].copy_from_slice(&self.count_deleted.to_le_bytes());
        buf[45..53].copy_from_slice(&self.dimensions.to_le_bytes());
        buf[53] = u8::from(self.multi);
        #[allow(clippy::cast_possible_truncation)]
        buf[54..56].copy_from_slice(&(self.capacities.m as u16).to_le_bytes());
        #[allow(clippy::cast_possible_truncation)]
        buf[56..58].copy_from_slice(&(self.capacities.m0 as u16).to_le_bytes());
        // buf[58..64] stay reserved, zeroed.
        buf
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::incompatible_format("file shorter than header"));
        }
        if &bytes[0..7] != MAGIC {
            return Err(Error::incompatible_format("bad magic"));
        }
        let version_major = u16::from_le_bytes(bytes[7..9].try_into().unwrap());
        if version_major != VERSION_MAJOR {
            return Err(Error::incompatible_format(format!(
                "file major version {version_major}, library expects {VERSION_MAJOR}"
            )));
        }
        let version_minor = u16::from_le_bytes(bytes[9..11].try_into().unwrap());
        let version_patch = u16::from_le_bytes(bytes[11..13].try_into().unwrap());
        if (version_minor, version_patch) > (VERSION_MINOR, VERSION_PATCH) {
            return Err(Error::incompatible_format(format!(
                "file version {version_major}.{version_minor}.{version_patch} is newer than library version {VERSION_MAJOR}.{VERSION_MINOR}.{VERSION_PATCH}"
            )));
        }
        let metric_kind =
            MetricKind::from_tag(u32::from_le_bytes(bytes[13..17].try_into().unwrap()))?;
        let scalar_kind =
            ScalarKind::from_tag(u32::from_le_bytes(bytes[17..21].try_into().unwrap()))?;
        let count_present = u64::from_le_bytes(bytes[29..37].try_into().unwrap());
        let count_deleted = u64::from_le_bytes(bytes[37..45].try_into().unwrap());
        let dimensions = u64::from_le_bytes(bytes[45..53].try_into().unwrap());
        let multi = bytes[53] != 0;
        let m = usize::from(u16::from_le_bytes(bytes[54..56].try_into().unwrap()));
        let m0 = usize::from(u16::from_le_bytes(bytes[56..58].try_into().unwrap()));
        Ok(Self {
            metric_kind,
            scalar_kind,
            count_present,
            count_deleted,
            dimensions,
            multi,
            capacities: LevelCapacities { m0, m },
        })
    }
}

/// One node's tape entry, decoded into owned data before any graph
/// exists to install it into (`view` cannot build the vector store,
/// and therefore the graph, until the node tape's length is known).
struct NodeRecord {
    key: u64,
    level: u16,
    tombstoned: bool,
    /// `neighbors[level]` for `level` in `0..=self.level`.
    neighbors: Vec<Vec<Slot>>,
}

fn parse_node_tape<R: Read>(
    reader: &mut R,
    capacities: LevelCapacities,
    slot_count: usize,
) -> Result<Vec<NodeRecord>> {
    let mut records = Vec::with_capacity(slot_count);
    for _ in 0..slot_count {
        let mut key_buf = [0u8; 8];
        reader.read_exact(&mut key_buf)?;
        let key = u64::from_le_bytes(key_buf);

        let mut level_buf = [0u8; 2];
        reader.read_exact(&mut level_buf)?;
        let (level, tombstoned) = decode_top_level(u16::from_le_bytes(level_buf));

        let mut neighbors = Vec::with_capacity(usize::from(level) + 1);
        for level_idx in 0..=usize::from(level) {
            let mut count_buf = [0u8; 2];
            reader.read_exact(&mut count_buf)?;
            let count = usize::from(u16::from_le_bytes(count_buf));
            let cap = capacities.at(level_idx);
            let mut level_neighbors = Vec::with_capacity(count);
            for i in 0..cap {
                let mut slot_buf = [0u8; 4];
                reader.read_exact(&mut slot_buf)?;
                if i < count {
                    level_neighbors.push(u32::from_le_bytes(slot_buf));
                }
            }
            neighbors.push(level_neighbors);
        }

        records.push(NodeRecord {
            key,
            level,
            tombstoned,
            neighbors,
        });
    }
    Ok(records)
}

/// Replays decoded node records into a freshly constructed `graph`,
/// then raises its entry point to the highest sampled level (ties
/// broken by smallest slot — the iteration order here), since the
/// binary format does not persist the entry point explicitly.
fn install_node_tape(graph: &HnswGraph, records: &[NodeRecord]) {
    let mut best: Option<(Slot, u16)> = None;
    for record in records {
        // `rebuild_node` allocates slots in ascending order starting
        // at 0, matching `records`'s iteration order.
        let slot = graph.rebuild_node(record.level, record.tombstoned);
        for (level_idx, level_neighbors) in record.neighbors.iter().enumerate() {
            graph.rebuild_set_neighbors(slot, level_idx, level_neighbors.clone());
        }
        if best.map_or(true, |(_, best_level)| record.level > best_level) {
            best = Some((slot, record.level));
        }
    }
    if let Some((slot, level)) = best {
        graph.rebuild_set_entry(slot, level);
    }
}

fn key_maps(records: &[NodeRecord], multi: bool) -> (KeyIndex, FxHashMap<Slot, u64>) {
    let keys = KeyIndex::new(multi, records.len());
    let mut slot_keys = FxHashMap::default();
    #[allow(clippy::cast_possible_truncation)]
    for (slot, record) in records.iter().enumerate() {
        let slot = slot as Slot;
        if !record.tombstoned {
            keys.insert(record.key, slot);
            slot_keys.insert(slot, record.key);
        }
    }
    (keys, slot_keys)
}

fn options_and_metric(header: &Header, limits: LoadLimits) -> Result<(IndexOptions, Metric)> {
    let dimensions = header.dimensions as usize;
    let metric = Metric::new(header.metric_kind, header.scalar_kind, dimensions)?;
    let options = IndexOptions::new(dimensions, header.metric_kind)
        .scalar_kind(header.scalar_kind)
        .connectivity(header.capacities.m, header.capacities.m0)
        .multi(header.multi)
        .max_threads(limits.max_threads)
        .expansion_search(limits.expansion_search)
        .expansion_add(limits.expansion_add);
    Ok((options, metric))
}

impl Index {
    /// Writes the whole index — header, node tape, vector payload — to
    /// `writer` in the format described above.
    pub fn save<W: Write>(&self, mut writer: W) -> Result<()> {
        let slot_count = self.graph.slot_count();
        let header = Header {
            metric_kind: self.graph.metric().kind(),
            scalar_kind: self.vectors.scalar_kind(),
            #[allow(clippy::cast_possible_truncation)]
            count_present: self.graph.len() as u64,
            #[allow(clippy::cast_possible_truncation)]
            count_deleted: self.graph.count_deleted() as u64,
            #[allow(clippy::cast_possible_truncation)]
            dimensions: self.options.dimensions as u64,
            multi: self.options.multi,
            capacities: self.options.capacities,
        };
        writer.write_all(&header.encode())?;

        let slot_keys = self.slot_keys.read();
        #[allow(clippy::cast_possible_truncation)]
        for slot in 0..slot_count as u32 {
            let level = self.graph.top_level_of(slot);
            let tombstoned = self.graph.is_tombstoned(slot);
            let key = slot_keys.get(&slot).copied().unwrap_or(0);
            writer.write_all(&key.to_le_bytes())?;
            writer.write_all(&encode_top_level(level, tombstoned).to_le_bytes())?;
            for level_idx in 0..=usize::from(level) {
                let neighbors = self.graph.neighbors_at(slot, level_idx);
                let cap = self.options.capacities.at(level_idx);
                #[allow(clippy::cast_possible_truncation)]
                writer.write_all(&(neighbors.len() as u16).to_le_bytes())?;
                for n in &neighbors {
                    writer.write_all(&n.to_le_bytes())?;
                }
                for _ in neighbors.len()..cap {
                    writer.write_all(&0u32.to_le_bytes())?;
                }
            }
        }
        drop(slot_keys);

        writer.write_all(&self.vectors.raw_bytes(slot_count))?;
        tracing::info!(slot_count, "index saved");
        Ok(())
    }

    /// Rebuilds a fully owned, mutable index by reading a stream
    /// previously produced by [`Index::save`].
    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Self::load_with_limits(reader, LoadLimits::default())
    }

    /// Like [`Index::load`], overriding the runtime knobs the binary
    /// format does not persist.
    pub fn load_with_limits<R: Read>(mut reader: R, limits: LoadLimits) -> Result<Self> {
        let mut header_bytes = [0u8; HEADER_LEN];
        reader.read_exact(&mut header_bytes)?;
        let header = Header::decode(&header_bytes)?;
        #[allow(clippy::cast_possible_truncation)]
        let slot_count = (header.count_present + header.count_deleted) as usize;

        let (options, metric) = options_and_metric(&header, limits)?;
        #[allow(clippy::cast_possible_truncation)]
        let vectors = Arc::new(VectorStore::with_capacity(
            header.dimensions as usize,
            header.scalar_kind,
            slot_count,
        ));
        let graph = HnswGraph::new(
            Arc::clone(&vectors) as Arc<dyn VectorSource>,
            metric,
            GraphParams {
                capacities: header.capacities,
                expansion_add: limits.expansion_add,
                expansion_search: limits.expansion_search,
                max_level_cap: options.max_level_cap,
                max_threads: limits.max_threads,
            },
        );

        let records = parse_node_tape(&mut reader, header.capacities, slot_count)?;
        install_node_tape(&graph, &records);
        let (keys, slot_keys) = key_maps(&records, header.multi);

        let bytes_per_vector = vectors.bytes_per_vector();
        let mut payload = vec![0u8; slot_count * bytes_per_vector];
        reader.read_exact(&mut payload)?;
        #[allow(clippy::cast_possible_truncation)]
        for slot in 0..slot_count as u32 {
            vectors.ensure_capacity(slot)?;
            let start = slot as usize * bytes_per_vector;
            vectors.write_at(slot, &payload[start..start + bytes_per_vector])?;
        }

        tracing::info!(slot_count, "index loaded");
        Ok(Self {
            options,
            graph,
            vectors,
            keys,
            slot_keys: parking_lot::RwLock::new(slot_keys),
        })
    }

    /// Builds a read-only index over `bytes`, a buffer the caller has
    /// already mapped (or otherwise holds in memory), whose `save`
    /// output begins at `offset`. The node tape is reconstructed into
    /// ordinary owned structures — it is comparatively small — but the
    /// vector payload is aliased in place, never copied, as long as
    /// `bytes` outlives the returned index.
    pub fn view(bytes: Arc<[u8]>, offset: usize) -> Result<Self> {
        Self::view_with_limits(bytes, offset, LoadLimits::default())
    }

    /// Like [`Index::view`], overriding the runtime knobs the binary
    /// format does not persist.
    pub fn view_with_limits(bytes: Arc<[u8]>, offset: usize, limits: LoadLimits) -> Result<Self> {
        if bytes.len() < offset + HEADER_LEN {
            return Err(Error::incompatible_format("file shorter than header"));
        }
        let header = Header::decode(&bytes[offset..offset + HEADER_LEN])?;
        #[allow(clippy::cast_possible_truncation)]
        let slot_count = (header.count_present + header.count_deleted) as usize;
        let (options, metric) = options_and_metric(&header, limits)?;

        let mut cursor = Cursor::new(&bytes[offset + HEADER_LEN..]);
        let records = parse_node_tape(&mut cursor, header.capacities, slot_count)?;
        #[allow(clippy::cast_possible_truncation)]
        let node_tape_len = cursor.position() as usize;
        let payload_offset = offset + HEADER_LEN + node_tape_len;

        let bytes_per_vector = header.scalar_kind.bytes_per_vector(header.dimensions as usize);
        if bytes.len() < payload_offset + slot_count * bytes_per_vector {
            return Err(Error::incompatible_format(
                "file shorter than declared vector payload",
            ));
        }
        let align = header.scalar_kind.scalar_align().max(8);
        if payload_offset % align != 0 {
            tracing::warn!(payload_offset, align, "mapped vector payload misaligned");
        }

        let vectors = Arc::new(VectorStore::mapped(
            header.dimensions as usize,
            header.scalar_kind,
            bytes,
            payload_offset,
        ));
        let graph = HnswGraph::new(
            Arc::clone(&vectors) as Arc<dyn VectorSource>,
            metric,
            GraphParams {
                capacities: header.capacities,
                expansion_add: limits.expansion_add,
                expansion_search: limits.expansion_search,
                max_level_cap: options.max_level_cap,
                max_threads: limits.max_threads,
            },
        );
        install_node_tape(&graph, &records);
        let (keys, slot_keys) = key_maps(&records, header.multi);

        tracing::info!(slot_count, "index viewed");
        Ok(Self {
            options,
            graph,
            vectors,
            keys,
            slot_keys: parking_lot::RwLock::new(slot_keys),
        })
    }
}

#[cfg(feature = "mmap")]
impl Index {
    /// Memory-maps `path` read-only and builds a [`Index::view`] over
    /// it. The mapping itself is not kept alive behind the alias this
    /// crate's `view` takes — see `DESIGN.md` for why this convenience
    /// constructor copies the mapped bytes into an owned `Arc<[u8]>`
    /// once, rather than the ideal zero-copy handle.
    pub fn view_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::view_file_with_limits(path, LoadLimits::default())
    }

    /// Like [`Index::view_file`], overriding the runtime knobs the
    /// binary format does not persist.
    pub fn view_file_with_limits(
        path: impl AsRef<std::path::Path>,
        limits: LoadLimits,
    ) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        // SAFETY: standard mmap caveat — the file must not be
        // concurrently truncated while mapped.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let bytes: Arc<[u8]> = Arc::from(mmap.as_ref());
        Self::view_with_limits(bytes, 0, limits)
    }
}
