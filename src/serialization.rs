//! The portable roaring format.
//!
//! See https://github.com/RoaringBitmap/RoaringFormatSpec for details. All values are little endian
//!
//! ```text
//! cookie        u32           12346, or 12347 | (count - 1) << 16 when run containers are present
//! count         u32           only with the 12346 cookie
//! run flags     [u8]          ceil(count / 8) bytes, only with the 12347 cookie
//! descriptors   [(u16, u16)]  key and cardinality - 1 for every container
//! offsets       [u32]         byte position of every body. Omitted with the 12347 cookie below 4 containers
//! bodies                      arrays as u16, bitsets as 1024 u64, runs as a u16 count then (start, length - 1)
//! ```

use std::io::{self, ErrorKind, Read, Write};

use tracing::debug;

use crate::container::{
    ArrayRef, BitsetRef, ContainerKind, ContainerRef, Rle16, RunRef,
    BITSET_SIZE_IN_WORDS, DEFAULT_MAX_SIZE
};
use crate::error::DeserializeError;
use crate::utils::{read_u16, read_u32, Packed};
use crate::{ImmutableBitmap, RoaringBitmap};

/// Cookie of a bitmap without run containers. Followed by the container count
pub const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;

/// Cookie of a bitmap with run containers. The high 16 bits hold the container count minus one
pub const SERIAL_COOKIE: u32 = 12347;

/// Bitmaps with run containers only carry an offset header from this many containers on
pub const NO_OFFSET_THRESHOLD: usize = 4;

/// Maximum number of containers in a bitmap
const MAX_CONTAINERS: usize = 1 << 16;

/// Size of a serialized bitset body
const BITSET_BYTES: usize = BITSET_SIZE_IN_WORDS * 8;

/// Size of the header for `count` containers
pub(crate) fn header_size(count: usize, has_runs: bool) -> usize {
    if has_runs {
        let offsets = if count >= NO_OFFSET_THRESHOLD { 4 * count } else { 0 };

        4 + (count + 7) / 8 + 4 * count + offsets
    }
    else {
        4 + 4 + 8 * count
    }
}

/// Check if any container of the bitmap is run length encoded
fn has_runs<B: ImmutableBitmap + ?Sized>(bitmap: &B) -> bool {
    (0..bitmap.container_count()).any(|index| bitmap.container_at(index).kind() == ContainerKind::Run)
}

/// Exact size of the serialized bitmap
pub(crate) fn serialized_size<B: ImmutableBitmap + ?Sized>(bitmap: &B) -> usize {
    let count = bitmap.container_count();
    let bodies: usize = (0..count)
        .map(|index| bitmap.container_at(index).serialized_size())
        .sum();

    header_size(count, has_runs(bitmap)) + bodies
}

/// Serialize any bitmap to a stream
pub(crate) fn serialize<B, W>(bitmap: &B, buf: &mut W) -> io::Result<usize>
    where B: ImmutableBitmap + ?Sized,
          W: Write
{
    let count = bitmap.container_count();
    let has_runs = has_runs(bitmap);
    let mut header = Vec::with_capacity(header_size(count, has_runs));

    if has_runs {
        let cookie = SERIAL_COOKIE | (((count - 1) << 16) as u32);
        header.extend_from_slice(&cookie.to_le_bytes());

        let mut flags = vec![0u8; (count + 7) / 8];
        for index in 0..count {
            if bitmap.container_at(index).kind() == ContainerKind::Run {
                flags[index / 8] |= 1 << (index % 8);
            }
        }

        header.extend_from_slice(&flags);
    }
    else {
        header.extend_from_slice(&SERIAL_COOKIE_NO_RUNCONTAINER.to_le_bytes());
        header.extend_from_slice(&(count as u32).to_le_bytes());
    }

    // Write the keys and cardinality
    for index in 0..count {
        let cardinality = bitmap.container_at(index).cardinality();

        header.extend_from_slice(&bitmap.key_at(index).to_le_bytes());
        header.extend_from_slice(&((cardinality - 1) as u16).to_le_bytes());
    }

    // Write the container offsets if there's no run containers or we're above the no offset threshold
    if !has_runs || count >= NO_OFFSET_THRESHOLD {
        let mut offset = header_size(count, has_runs);

        for index in 0..count {
            header.extend_from_slice(&(offset as u32).to_le_bytes());
            offset += bitmap.container_at(index).serialized_size();
        }
    }

    debug_assert_eq!(header.len(), header_size(count, has_runs));
    buf.write_all(&header)?;

    let mut written = header.len();
    for index in 0..count {
        written += bitmap.container_at(index).serialize(buf)?;
    }

    Ok(written)
}

/// Decode the cookie at the start of `bytes`. Returns the container count and whether run containers are present.
///
/// Needs 4 bytes, or 8 for the cookie without run containers
fn decode_cookie(bytes: &[u8]) -> Result<(usize, bool), DeserializeError> {
    if bytes.len() < 4 {
        return Err(DeserializeError::UnexpectedEof { needed: 4, available: bytes.len() });
    }

    let cookie = read_u32(bytes, 0);

    if cookie & 0xFFFF == SERIAL_COOKIE {
        Ok(((cookie >> 16) as usize + 1, true))
    }
    else if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        if bytes.len() < 8 {
            return Err(DeserializeError::UnexpectedEof { needed: 8, available: bytes.len() });
        }

        let count = read_u32(bytes, 4);
        if count as usize > MAX_CONTAINERS {
            return Err(DeserializeError::InvalidContainerCount(count));
        }

        Ok((count as usize, false))
    }
    else {
        Err(DeserializeError::InvalidCookie(cookie))
    }
}

/// The header of a serialized bitmap, borrowed from the buffer
#[derive(Clone, Copy, Debug)]
pub(crate) struct Header<'a> {
    /// Number of containers
    pub count: usize,

    /// Run flags, present if any container is run length encoded
    pub run_flags: Option<&'a [u8]>,

    /// Key and cardinality - 1 pairs
    pub descriptors: &'a [u8],

    /// Body positions, if the header carries them
    pub offsets: Option<&'a [u8]>,

    /// Size of the header in bytes
    pub size: usize
}

impl<'a> Header<'a> {
    /// Parse the header at the start of `bytes`. Keys must be strictly increasing
    pub fn parse(bytes: &'a [u8]) -> Result<Self, DeserializeError> {
        let (count, has_runs) = decode_cookie(bytes)?;

        let size = header_size(count, has_runs);
        if bytes.len() < size {
            return Err(DeserializeError::UnexpectedEof { needed: size, available: bytes.len() });
        }

        let (run_flags, descriptors_start) = if has_runs {
            let flags_end = 4 + (count + 7) / 8;
            (Some(&bytes[4..flags_end]), flags_end)
        }
        else {
            (None, 8)
        };

        let descriptors_end = descriptors_start + 4 * count;
        let offsets = if !has_runs || count >= NO_OFFSET_THRESHOLD {
            Some(&bytes[descriptors_end..(descriptors_end + 4 * count)])
        }
        else {
            None
        };

        let header = Self {
            count,
            run_flags,
            descriptors: &bytes[descriptors_start..descriptors_end],
            offsets,
            size
        };

        for index in 1..count {
            if header.key(index) <= header.key(index - 1) {
                return Err(DeserializeError::UnsortedKeys(index));
            }
        }

        Ok(header)
    }

    #[inline]
    pub fn key(&self, index: usize) -> u16 {
        read_u16(self.descriptors, 4 * index)
    }

    #[inline]
    pub fn cardinality(&self, index: usize) -> usize {
        read_u16(self.descriptors, 4 * index + 2) as usize + 1
    }

    /// The stored body position of the container at `index`
    #[inline]
    pub fn offset(&self, index: usize) -> Option<u32> {
        self.offsets.map(|offsets| read_u32(offsets, 4 * index))
    }

    /// The representation of the container at `index`
    #[inline]
    pub fn kind(&self, index: usize) -> ContainerKind {
        let is_run = self.run_flags
            .map_or(false, |flags| flags[index / 8] & (1 << (index % 8)) != 0);

        if is_run {
            ContainerKind::Run
        }
        else if self.cardinality(index) <= DEFAULT_MAX_SIZE {
            ContainerKind::Array
        }
        else {
            ContainerKind::Bitset
        }
    }

    /// Check the stored offset of the container at `index` against the actual position
    pub fn check_offset(&self, index: usize, position: usize) -> Result<(), DeserializeError> {
        match self.offset(index) {
            Some(found) if found as usize != position => {
                Err(DeserializeError::InvalidOffset {
                    index,
                    found,
                    expected: position as u32
                })
            },
            _ => Ok(())
        }
    }
}

/// Borrow a container body in place. For run containers `body` starts after the run count
pub(crate) fn body_ref(kind: ContainerKind, cardinality: usize, body: &[u8]) -> ContainerRef<'_> {
    match kind {
        ContainerKind::Array => ArrayRef::new(Packed::Le(body)).into(),
        ContainerKind::Bitset => BitsetRef::new(Packed::Le(body), cardinality).into(),
        ContainerKind::Run => RunRef::new(Packed::Le(body), cardinality).into()
    }
}

/// Check that runs are sorted, don't overlap, stay inside the container and add up to `cardinality`.
/// Touching runs are accepted
pub(crate) fn validate_runs(key: u16, runs: Packed<'_, Rle16>, cardinality: usize) -> Result<(), DeserializeError> {
    let mut previous_end = 0;
    let mut total = 0;

    for run in runs.iter() {
        if run.start() < previous_end {
            return Err(DeserializeError::InvalidContainer { key, reason: "overlapping or unsorted runs" });
        }

        if run.end() > 1 << 16 {
            return Err(DeserializeError::InvalidContainer { key, reason: "run exceeds the container" });
        }

        previous_end = run.end();
        total += run.cardinality();
    }

    if total != cardinality {
        return Err(DeserializeError::InvalidContainer { key, reason: "run lengths disagree with the cardinality" });
    }

    Ok(())
}

/// Check the parts of a container body that the header can't vouch for
pub(crate) fn validate_body(key: u16, container: &ContainerRef<'_>) -> Result<(), DeserializeError> {
    match container {
        ContainerRef::Array(array) => {
            let values = array.values();
            let sorted = (1..values.len()).all(|index| values.get(index - 1) < values.get(index));

            if !sorted {
                return Err(DeserializeError::InvalidContainer { key, reason: "array values are not strictly increasing" });
            }
        },
        ContainerRef::Bitset(bitset) => {
            let count: usize = bitset.words()
                .iter()
                .map(|word| word.count_ones() as usize)
                .sum();

            if count != bitset.cardinality() {
                return Err(DeserializeError::InvalidContainer { key, reason: "bitset population disagrees with the cardinality" });
            }
        },
        ContainerRef::Run(run) => validate_runs(key, run.runs(), run.cardinality())?
    }

    Ok(())
}

/// Fill `buf` from `reader`. `position` is the number of bytes consumed before, used for error reporting
fn fill<R: Read>(reader: &mut R, buf: &mut [u8], position: usize) -> Result<(), DeserializeError> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(DeserializeError::UnexpectedEof {
                    needed: position + buf.len(),
                    available: position + filled
                });
            },
            Ok(read) => filled += read,
            Err(err) if err.kind() == ErrorKind::Interrupted => (),
            Err(err) => return Err(err.into())
        }
    }

    Ok(())
}

impl RoaringBitmap {
    /// Deserialize a bitmap from a stream in the portable roaring format.
    ///
    /// The stream is read sequentially and every container is validated before it is added,
    /// nothing is returned for a malformed stream.
    ///
    /// # Returns
    /// The deserialized bitmap
    pub fn deserialize<R: Read>(buf: &mut R) -> Result<Self, DeserializeError> {
        debug!("deserializing bitmap from stream");

        Self::read_from(buf).map_err(|err| {
            debug!(error = %err, "rejected serialized bitmap");
            err
        })
    }

    /// Deserialize a bitmap from a byte slice in the portable roaring format.
    ///
    /// Trailing bytes after the bitmap are ignored
    pub fn deserialize_from_slice(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let view = crate::RoaringView::new(bytes)?;

        view.validate_bodies().map_err(|err| {
            debug!(error = %err, "rejected serialized bitmap");
            err
        })?;

        Ok(view.to_bitmap())
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, DeserializeError> {
        // Read out the cookie, and the count if the cookie is followed by one
        let mut header = vec![0; 4];
        fill(reader, &mut header, 0)?;

        if read_u32(&header, 0) == SERIAL_COOKIE_NO_RUNCONTAINER {
            header.resize(8, 0);
            fill(reader, &mut header[4..], 4)?;
        }

        // Read the rest of the header once its size is known
        let (count, has_runs) = decode_cookie(&header)?;
        let prefix = header.len();
        header.resize(header_size(count, has_runs), 0);
        fill(reader, &mut header[prefix..], prefix)?;

        let header = Header::parse(&header)?;
        let mut position = header.size;
        let mut result = Self::with_capacity(count);
        let mut body = Vec::new();

        for index in 0..count {
            header.check_offset(index, position)?;

            let key = header.key(index);
            let kind = header.kind(index);
            let cardinality = header.cardinality(index);

            let len = match kind {
                ContainerKind::Array => 2 * cardinality,
                ContainerKind::Bitset => BITSET_BYTES,
                ContainerKind::Run => {
                    let mut runs = [0; 2];
                    fill(reader, &mut runs, position)?;
                    position += 2;

                    4 * u16::from_le_bytes(runs) as usize
                }
            };

            body.resize(len, 0);
            fill(reader, &mut body, position)?;
            position += len;

            let container = body_ref(kind, cardinality, &body);
            validate_body(key, &container)?;

            result.push_container(key, container.to_owned());
        }

        Ok(result)
    }
}
