//! Multipart split sizing
//!
//! Decides how a file is cut into parts for upload. Small files go up in
//! one piece; large files are split so the number of parts scales with the
//! available parallelism rather than with the file size.

/// Files at or above this size are uploaded in multiple parts: 1 GiB
pub const LARGE_FILE_THRESHOLD: u64 = 1024 * 1024 * 1024;

/// Target number of parts per unit of parallelism
pub const PARTS_PER_WORKER: u64 = 35;

/// Minimum part size accepted by S3-compatible backends: 5 MiB
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Maximum part size accepted by S3-compatible backends: 5 GiB
pub const MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Maximum number of parts in one multipart upload (S3 limit)
pub const MAX_PARTS: u64 = 10_000;

/// How a file is split for upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPlan {
    /// Size of every part but possibly the last
    pub part_size: u64,
    /// Number of parts, always at least 1
    pub part_count: u64,
}

impl PartitionPlan {
    /// Compute the split for a file of `file_size` bytes
    pub fn plan(file_size: u64, parallelism: usize) -> Self {
        Self::plan_with_threshold(file_size, parallelism, LARGE_FILE_THRESHOLD)
    }

    /// Same as [`plan`](Self::plan) with a custom single-part cutoff
    pub fn plan_with_threshold(file_size: u64, parallelism: usize, threshold: u64) -> Self {
        if file_size < threshold {
            return Self {
                part_size: file_size,
                part_count: 1,
            };
        }

        let parallelism = parallelism.max(1) as u64;
        let part_size = file_size / PARTS_PER_WORKER.saturating_mul(parallelism);
        let part_count = if part_size == 0 {
            1
        } else {
            // round(file_size / part_size), half away from zero
            let (f, p) = (file_size as u128, part_size as u128);
            (((2 * f + p) / (2 * p)) as u64).max(1)
        };

        Self {
            part_size,
            part_count,
        }
    }

    /// Whether the file goes up in a single request
    pub fn is_single_part(&self) -> bool {
        self.part_count <= 1
    }

    /// Fit the part size between a backend minimum and [`MAX_PART_SIZE`],
    /// keeping within the part limit
    ///
    /// Single-part plans are returned unchanged.
    pub fn with_min_part_size(self, file_size: u64, min_part_size: u64) -> Self {
        if self.is_single_part() {
            return self;
        }

        let mut part_size = self.part_size.max(min_part_size).max(1);
        if file_size.div_ceil(part_size) > MAX_PARTS {
            part_size = file_size.div_ceil(MAX_PARTS);
        }
        let part_size = part_size.min(MAX_PART_SIZE);

        Self {
            part_size,
            part_count: file_size.div_ceil(part_size).max(1),
        }
    }

    /// Byte range `[start, end)` of a 1-based part
    ///
    /// The last part runs to the end of the file, so the `part_count`
    /// ranges always cover every byte exactly once.
    pub fn part_range(&self, part_number: u64, file_size: u64) -> (u64, u64) {
        let start = ((part_number - 1) * self.part_size).min(file_size);
        let end = if part_number >= self.part_count {
            file_size
        } else {
            (start + self.part_size).min(file_size)
        };
        (start, end)
    }
}
