#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    type_class: &'static str,
    file: TestFile,
}

impl TestCase {
    pub fn new(name: &'static str, type_class: &'static str, file: TestFile) -> Self {
        Self { name, type_class, file }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name the payload is resolved to.
    pub fn type_class(&self) -> &'static str {
        self.type_class
    }

    pub fn file(&self) -> &TestFile {
        &self.file
    }

    pub fn file_name(&self) -> &'static str {
        self.file().file_name
    }
}

#[derive(Debug, Copy, Clone)]
pub struct TestFile {
    file_name: &'static str,
    content: &'static str,
}

impl TestFile {
    pub const fn new(file_name: &'static str, content: &'static str) -> Self {
        Self { file_name, content }
    }

    pub fn content(&self) -> &'static str {
        self.content
    }

    pub fn file_name(&self) -> &'static str {
        self.file_name
    }
}
