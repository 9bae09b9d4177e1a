use arbor::{HierarchicalConfiguration, TreeNode};

pub const USER_FIELDS: &[&str] = &["uid", "uname", "firstName", "lastName", "email"];
pub const DOC_FIELDS: &[&str] = &["docid", "name", "creationDate", "authorID", "version"];

fn field(name: &str) -> TreeNode {
    TreeNode::new("field").with_child(TreeNode::new("name").with_value(name))
}

fn table(kind: &str, name: &str, fields: &[&str]) -> TreeNode {
    TreeNode::new("table")
        .with_attribute("type", kind)
        .with_child(TreeNode::new("name").with_value(name))
        .with_child(TreeNode::new("fields").with_children(fields.iter().map(|f| field(f))))
}

/// Two database tables with five fields each:
///
/// ```text
/// tables
///   table [@type=system]       name=users      fields.field.name = uid, uname, ...
///   table [@type=application]  name=documents  fields.field.name = docid, name, ...
/// ```
pub fn tables_tree() -> TreeNode {
    TreeNode::new("database").with_child(
        TreeNode::new("tables")
            .with_child(table("system", "users", USER_FIELDS))
            .with_child(table("application", "documents", DOC_FIELDS)),
    )
}

pub fn tables_config() -> HierarchicalConfiguration {
    HierarchicalConfiguration::with_root(tables_tree()).unwrap()
}

/// A small nested configuration mixing values, attributes and structure-only nodes.
pub fn server_config() -> HierarchicalConfiguration {
    HierarchicalConfiguration::with_root(
        TreeNode::new("config")
            .with_attribute("version", "1.0")
            .with_child(
                TreeNode::new("server")
                    .with_attribute("secure", true)
                    .with_child(TreeNode::new("host").with_value("localhost"))
                    .with_child(TreeNode::new("port").with_value(8080)),
            )
            .with_child(
                TreeNode::new("a")
                    .with_child(TreeNode::new("b").with_child(TreeNode::new("c").with_value(1)))
                    .with_child(TreeNode::new("d").with_value(2)),
            )
            .with_child(TreeNode::new("empty").with_child(TreeNode::new("nested"))),
    )
    .unwrap()
}
