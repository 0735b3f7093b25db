// Event system test module
#[cfg(test)]
mod dispatcher_tests;
#[cfg(test)]
mod manager_tests;

#[cfg(test)]
mod tests {
    use crate::event::EventPriority;

    #[test]
    fn test_event_priority_default() {
        assert_eq!(EventPriority::default(), EventPriority::Normal);
    }

    #[test]
    fn test_event_priority_ordering() {
        assert!(EventPriority::Low < EventPriority::Normal);
        assert!(EventPriority::Normal < EventPriority::High);
        assert!(EventPriority::High < EventPriority::Critical);
    }
}
