/// One loaded unit of dialogue: a titled body of script text.
///
/// Extra fields a project file may carry (position, colour) belong to the
/// loader and are not represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YarnNode {
    pub title: String,
    /// Space-separated tag list, kept as written.
    pub tags: String,
    pub body: String,
}

impl YarnNode {
    /// Iterate the individual tags.
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags.split_whitespace()
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag_list().any(|t| t == tag)
    }
}
