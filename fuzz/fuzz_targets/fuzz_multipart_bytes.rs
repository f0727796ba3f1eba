#![no_main]

use libfuzzer_sys::fuzz_target;
use multispool::{Constraints, DataSize, MultipartConsumer, Part, SizeLimit};

fuzz_target!(|data: &[u8]| {
    // The first byte picks the chunk size so that delimiter splits get exercised too.
    let (chunk_size, body) = match data.split_first() {
        Some((first, rest)) => (*first as usize + 1, rest),
        None => return,
    };

    let constraints = Constraints::new().scratch_buffer_size(64).size_limit(
        SizeLimit::new()
            .whole_stream(DataSize::kibibytes(64))
            .per_part_header(DataSize::kibibytes(4))
            .per_field(DataSize::kibibytes(16)),
    );

    let mut consumer = match MultipartConsumer::new("X-BOUNDARY", Vec::<Part>::new(), constraints, None) {
        Ok(consumer) => consumer,
        Err(_) => return,
    };

    for chunk in body.chunks(chunk_size) {
        if consumer.data(chunk, false).is_err() {
            return;
        }
    }

    if consumer.data(&[], true).is_ok() {
        let _ = consumer.finish();
    }
});
