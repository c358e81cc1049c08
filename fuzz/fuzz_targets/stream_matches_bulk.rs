#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&buf_size, data)) = data.split_first() else {
        return;
    };
    let Ok(decoded) = qoadec::decode_all(std::io::Cursor::new(data)) else {
        return;
    };
    let mut decoder = qoadec::StreamDecoder::new(std::io::Cursor::new(data))
        .expect("decode_all accepted the headers");
    let mut buf = vec![0_i16; buf_size as usize + 1];
    let mut streamed = Vec::new();
    loop {
        let n = decoder.decode(&mut buf);
        if n == 0 {
            break;
        }
        streamed.extend_from_slice(&buf[..n]);
    }
    assert_eq!(streamed, decoded.samples);
});
