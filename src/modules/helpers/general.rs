pub struct Helpers {}

impl Helpers {
    /// # append the items `target` does not hold yet
    /// keeps the order of both, the first occurrence wins.
    pub fn extend_unique<T: PartialEq + Clone>(target: &mut Vec<T>, items: &[T]) {
        for item in items {
            if !target.contains(item) {
                target.push(item.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_occurrence_order() {
        let mut sections = vec!["Section 1", "Section 2"];
        Helpers::extend_unique(&mut sections, &["Section 2", "Section 4", "Section 3", "Section 4"]);
        assert_eq!(sections, vec!["Section 1", "Section 2", "Section 4", "Section 3"]);
    }
}
