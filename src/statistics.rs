use crate::container::ContainerKind;
use crate::ImmutableBitmap;

/// RoaringStatistics can be used to collect detailed statistics about the composition of a roaring bitmap
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoaringStatistics {
    /// Number of containers
    pub containers: usize,

    /// Number of array containers
    pub array_containers: usize,

    ///  Number of run containers
    pub run_containers: usize,

    /// Number of bitmap containers
    pub bitset_containers: usize,

    /// Number of values in array containers
    pub values_array_containers: u64,

    /// Number of values in run containers
    pub values_run_containers: u64,

    /// Number of values in bitmap containers
    pub values_bitset_containers: u64,

    /// Number of serialized bytes in array containers
    pub bytes_array_containers: usize,

    /// Number of serialized bytes in run containers
    pub bytes_run_containers: usize,

    /// Number of serialized bytes in bitmap containers
    pub bytes_bitset_containers: usize,

    /// Maximal value. `None` if the bitmap is empty
    pub max_value: Option<u32>,

    /// Minimal value. `None` if the bitmap is empty
    pub min_value: Option<u32>,

    /// The sum of all values (could be used to compute average)
    pub sum_value: u64,

    /// Total number of values in the bitmap
    pub cardinality: u64
}

impl RoaringStatistics {
    /// Walk the containers of `bitmap`
    pub fn collect<B: ImmutableBitmap + ?Sized>(bitmap: &B) -> Self {
        let mut stats = Self {
            containers: bitmap.container_count(),
            min_value: bitmap.min(),
            max_value: bitmap.max(),
            ..Self::default()
        };

        for index in 0..bitmap.container_count() {
            let container = bitmap.container_at(index);
            let cardinality = container.cardinality() as u64;
            let bytes = container.serialized_size();

            match container.kind() {
                ContainerKind::Array => {
                    stats.array_containers += 1;
                    stats.values_array_containers += cardinality;
                    stats.bytes_array_containers += bytes;
                },
                ContainerKind::Bitset => {
                    stats.bitset_containers += 1;
                    stats.values_bitset_containers += cardinality;
                    stats.bytes_bitset_containers += bytes;
                },
                ContainerKind::Run => {
                    stats.run_containers += 1;
                    stats.values_run_containers += cardinality;
                    stats.bytes_run_containers += bytes;
                }
            }

            // Sum each span as an arithmetic series
            let base = u64::from(bitmap.key_at(index)) << 16;
            for (start, end) in container.spans() {
                let (start, end) = (base + u64::from(start), base + u64::from(end));
                stats.sum_value += (start + end - 1) * (end - start) / 2;
            }

            stats.cardinality += cardinality;
        }

        stats
    }
}

#[cfg(test)]
mod test {
    use crate::{ImmutableBitmap, RoaringBitmap, RoaringStatistics};

    #[test]
    fn composition() {
        let mut bitmap = RoaringBitmap::from_slice(&[1, 5, 9]);
        bitmap.add_range(1 << 16..(1 << 16) + 10_000);
        bitmap.add_slice(&(0..5000).map(|value| (2 << 16) + value * 3).collect::<Vec<u32>>());
        bitmap.run_optimize();

        let stats = bitmap.statistics();

        assert_eq!(stats.containers, 3);
        assert_eq!(stats.array_containers, 1);
        assert_eq!(stats.run_containers, 1);
        assert_eq!(stats.bitset_containers, 1);
        assert_eq!(stats.values_array_containers, 3);
        assert_eq!(stats.values_run_containers, 10_000);
        assert_eq!(stats.values_bitset_containers, 5000);
        assert_eq!(stats.bytes_array_containers, 6);
        assert_eq!(stats.bytes_run_containers, 6);
        assert_eq!(stats.bytes_bitset_containers, 8192);
        assert_eq!(stats.cardinality, bitmap.cardinality());
        assert_eq!(stats.min_value, Some(1));
        assert_eq!(stats.max_value, Some((2 << 16) + 4999 * 3));

        let sum: u64 = bitmap.iter().map(u64::from).sum();
        assert_eq!(stats.sum_value, sum);
    }

    #[test]
    fn empty() {
        let stats = RoaringStatistics::collect(&RoaringBitmap::new());

        assert_eq!(stats, RoaringStatistics::default());
        assert_eq!(stats.min_value, None);
    }
}
