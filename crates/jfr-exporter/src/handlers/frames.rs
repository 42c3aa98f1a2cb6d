use jfr_types::RawEvent;

const UNKNOWN_THREAD: &str = "<unknown>";

/// Render the stack trace of `event`, `None` when it was not recorded.
pub(crate) fn render_stack_trace(event: &RawEvent) -> Option<Vec<String>> {
    event
        .stack_trace
        .as_ref()
        .map(|frames| frames.iter().map(ToString::to_string).collect())
}

/// Java name of the thread stored under `key`, `<unknown>` when absent.
pub(crate) fn thread_name<'a>(event: &'a RawEvent, key: &str) -> &'a str {
    event.optional_string(key).unwrap_or(UNKNOWN_THREAD)
}

/// Turn a JVM class descriptor into a readable type name.
///
/// `[B` becomes `byte[]` and `[Ljava.lang.Byte;` becomes `java.lang.Byte[]`.
/// Names that are not array descriptors are returned unchanged.
pub fn translate_class_name(name: &str) -> String {
    let element = name.trim_start_matches('[');
    let dimensions = name.len() - element.len();
    if dimensions == 0 {
        return name.to_string();
    }

    let element = match element {
        "B" => "byte",
        "C" => "char",
        "D" => "double",
        "F" => "float",
        "I" => "int",
        "J" => "long",
        "S" => "short",
        "Z" => "boolean",
        other => match other
            .strip_prefix('L')
            .and_then(|class| class.strip_suffix(';'))
        {
            Some(class) => class,
            None => return name.to_string(),
        },
    };

    format!("{element}{}", "[]".repeat(dimensions))
}

#[cfg(test)]
mod tests {
    use jfr_types::StackFrame;
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;

    #[test]
    fn translates_array_descriptors() {
        assert_eq!(translate_class_name("byte"), "byte");
        assert_eq!(translate_class_name("[B"), "byte[]");
        assert_eq!(translate_class_name("[Ljava.lang.Byte;"), "java.lang.Byte[]");
        assert_eq!(translate_class_name("[[[[[B"), "byte[][][][][]");
        assert_eq!(translate_class_name("java.lang.String"), "java.lang.String");
        assert_eq!(translate_class_name("[X"), "[X");
    }

    #[test]
    fn renders_frames_and_threads() {
        let event = RawEvent::new("jdk.ObjectAllocationSample")
            .with_value("eventThread", "main")
            .with_stack_trace(vec![StackFrame::new("a.B", "run", 12)]);

        assert_eq!(
            render_stack_trace(&event),
            Some(vec!["a.B.run (line: 12)".to_string()])
        );
        assert_eq!(thread_name(&event, "eventThread"), "main");
        assert_eq!(thread_name(&event, "notifier"), "<unknown>");
        assert_eq!(
            render_stack_trace(&RawEvent::new("jdk.ObjectAllocationSample")),
            None
        );
    }
}
