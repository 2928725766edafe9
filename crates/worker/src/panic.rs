use std::any::Any;

/// Extracts a readable message from a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_owned()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"panic with non-string payload".to_owned()
	}
}

#[cfg(test)]
mod tests {
	use std::panic::catch_unwind;

	use super::panic_message;

	#[test]
	fn extracts_static_str_payload() {
		let payload = catch_unwind(|| panic!("boom-str")).unwrap_err();
		let msg = panic_message(payload.as_ref());
		assert!(msg.contains("boom-str"), "expected 'boom-str', got: {msg}");
	}

	#[test]
	fn extracts_string_payload() {
		let payload = catch_unwind(|| panic!("{}", String::from("boom-string"))).unwrap_err();
		let msg = panic_message(payload.as_ref());
		assert!(msg.contains("boom-string"), "expected 'boom-string', got: {msg}");
	}

	#[test]
	fn falls_back_for_opaque_payload() {
		let payload = catch_unwind(|| std::panic::panic_any(42_u32)).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "panic with non-string payload");
	}
}
