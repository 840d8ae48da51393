use std::any::Any;

/// Extracts the message from a panic payload, if it carries one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
	if let Some(msg) = payload.downcast_ref::<&'static str>() {
		return Some(msg);
	}
	payload.downcast_ref::<String>().map(String::as_str)
}

#[cfg(test)]
#[path = "panic_tests.rs"]
mod tests;
