//! Bitmaps serialize as an ascending sequence of their values

use std::fmt;

use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::{ImmutableBitmap, RoaringBitmap, RoaringView};

fn serialize_values<B, S>(bitmap: &B, serializer: S) -> Result<S::Ok, S::Error>
    where B: ImmutableBitmap,
          S: Serializer
{
    let mut seq = serializer.serialize_seq(Some(bitmap.cardinality() as usize))?;
    for value in bitmap.iter() {
        seq.serialize_element(&value)?;
    }

    seq.end()
}

impl Serialize for RoaringBitmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_values(self, serializer)
    }
}

impl<'a> Serialize for RoaringView<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_values(self, serializer)
    }
}

struct BitmapVisitor;

impl<'de> Visitor<'de> for BitmapVisitor {
    type Value = RoaringBitmap;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a sequence of u32 values")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where A: SeqAccess<'de>
    {
        let mut bitmap = RoaringBitmap::new();
        while let Some(value) = seq.next_element::<u32>()? {
            bitmap.add(value);
        }

        Ok(bitmap)
    }
}

impl<'de> Deserialize<'de> for RoaringBitmap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(BitmapVisitor)
    }
}
