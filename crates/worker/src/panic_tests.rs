use std::panic::{self, AssertUnwindSafe};

use super::panic_message;

fn payload_of(f: impl FnOnce()) -> Box<dyn std::any::Any + Send> {
	panic::catch_unwind(AssertUnwindSafe(f)).expect_err("closure should panic")
}

#[test]
fn extracts_static_str_payload() {
	let payload = payload_of(|| panic!("boom-str"));
	let msg = panic_message(&*payload).expect("should carry a message");
	assert!(msg.contains("boom-str"), "expected 'boom-str', got: {msg}");
}

#[test]
fn extracts_string_payload() {
	let payload = payload_of(|| panic!("{}", String::from("boom-string")));
	let msg = panic_message(&*payload).expect("should carry a message");
	assert!(msg.contains("boom-string"), "expected 'boom-string', got: {msg}");
}

#[test]
fn returns_none_for_opaque_payload() {
	let payload = payload_of(|| panic::panic_any(42u32));
	assert!(panic_message(&*payload).is_none(), "opaque payload should return None");
}
