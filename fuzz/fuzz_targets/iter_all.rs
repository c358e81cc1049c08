#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&buf_size, data)) = data.split_first() else {
        return;
    };
    let Ok(mut decoder) = qoadec::StreamDecoder::new(std::io::Cursor::new(data)) else {
        return
    };
    let mut buf = vec![0_i16; buf_size as usize + 1];
    while decoder.decode(&mut buf) > 0 {}
});
