//! Parse tree to canonical [`Query`] conversion.
//!
//! Resolves literals, property paths, locality markers and subject kinds, and
//! enforces the statement rules:
//! - update/delete on anything but a document needs a `where`
//! - select on a document, and show, take no `where`
//! - select names at least one field or `*`

use crate::ast::*;
use crate::error::{SyntaxError, SyntaxResult};
use crate::literal::{evaluate, evaluate_count};
use crate::tree::*;

pub fn transform(statement: Statement) -> SyntaxResult<Query> {
    match statement {
        Statement::Select(node) => transform_select(node).map(Query::Select),
        Statement::Update(node) => transform_update(node).map(Query::Update),
        Statement::Delete(node) => transform_delete(node).map(Query::Delete),
        Statement::Insert(node) => transform_insert(node).map(Query::Insert),
        Statement::Show(node) => transform_show(node).map(Query::Show),
    }
}

fn transform_subject(node: &SubjectNode) -> Subject {
    match node.keyword {
        SubjectKeyword::From => Subject::collection(node.name.clone()),
        SubjectKeyword::Within => Subject::collection_group(node.name.clone()),
        SubjectKeyword::At => {
            let path = node.name.trim_matches('/').to_string();
            if segment_count(&path) % 2 == 0 {
                Subject::document(path)
            } else {
                Subject::collection(path)
            }
        }
    }
}

fn transform_predicates(nodes: Option<Vec<PredicateNode>>) -> SyntaxResult<Vec<WhereClause>> {
    nodes
        .unwrap_or_default()
        .into_iter()
        .map(|node| {
            Ok(WhereClause {
                property: node.property.path,
                local: node.local_marker || node.operator.is_local_only(),
                operator: node.operator,
                value: evaluate(&node.value)?,
            })
        })
        .collect()
}

fn transform_setters(nodes: Vec<SetterNode>) -> SyntaxResult<Vec<Setter>> {
    nodes
        .into_iter()
        .map(|node| {
            Ok(Setter {
                property: node.property.path,
                value: evaluate(&node.value)?,
            })
        })
        .collect()
}

fn transform_select(node: SelectNode) -> SyntaxResult<SelectQuery> {
    let subject = transform_subject(&node.subject);

    if subject.kind == SubjectType::Document && node.predicates.is_some() {
        return Err(SyntaxError::at(
            "A select on a single document cannot have a where clause",
            node.position,
        )
        .with_fragment(subject.path));
    }

    let fields = match node.fields {
        FieldsNode::Star => Fields::All,
        FieldsNode::List(list) if list.is_empty() => {
            return Err(SyntaxError::at(
                "A select must name at least one field or '*'",
                node.position,
            ))
        }
        FieldsNode::List(list) => Fields::List(list.into_iter().map(|p| p.path).collect()),
    };

    let where_clauses = transform_predicates(node.predicates)?;

    let order = node
        .sorters
        .unwrap_or_default()
        .into_iter()
        .map(|sorter| OrderBy {
            property: sorter.property.path,
            direction: sorter.direction.unwrap_or_default(),
            local: sorter.local_marker,
        })
        .collect();

    let limit = node
        .limit
        .as_ref()
        .map(|value| evaluate_count(value, "limit"))
        .transpose()?;

    let page = match node.page.as_ref() {
        Some(value) => {
            let size = evaluate_count(value, "page")?;
            if size == 0 {
                return Err(
                    SyntaxError::at("'page' expects a positive integer", value.position())
                        .with_fragment("0"),
                );
            }
            Some(size)
        }
        None => None,
    };

    let function = node.function.map(transform_function).transpose()?;
    let output = node.output.map(transform_output).transpose()?;

    Ok(SelectQuery {
        subject,
        where_clauses,
        fields,
        limit,
        page,
        order,
        group: node.group.map(|p| p.path),
        function,
        output,
    })
}

fn transform_function(node: FunctionNode) -> SyntaxResult<Function> {
    match node.name.to_lowercase().as_str() {
        "count" => Ok(Function::Count),
        "distinct" => Ok(Function::Distinct),
        _ => Err(SyntaxError::at(
            format!(
                "Unknown function '{}', expected count or distinct",
                node.name
            ),
            node.position,
        )
        .with_fragment(node.name)),
    }
}

fn transform_output(node: OutputNode) -> SyntaxResult<OutputSpec> {
    let format = match node.format {
        Some((name, position)) => match name.to_lowercase().as_str() {
            "json" => Some(Format::Json),
            "csv" => Some(Format::Csv),
            _ => {
                return Err(SyntaxError::at(
                    format!("Unknown output format '{}', expected json or csv", name),
                    position,
                )
                .with_fragment(name))
            }
        },
        None => None,
    };

    let (kind, destination) = match node.target {
        Some(OutputTarget::Clipboard) => (OutputKind::Clipboard, None),
        Some(OutputTarget::Path(path)) => (OutputKind::Path, Some(path)),
        None => (OutputKind::None, None),
    };

    Ok(OutputSpec {
        kind,
        format,
        destination,
    })
}

/// Mutations on a collection must be narrowed by a where clause.
fn require_where(
    subject: &Subject,
    predicates: &Option<Vec<PredicateNode>>,
    statement: &str,
    position: crate::error::Position,
) -> SyntaxResult<()> {
    let has_where = predicates.as_ref().is_some_and(|p| !p.is_empty());
    if subject.kind != SubjectType::Document && !has_where {
        return Err(SyntaxError::at(
            format!("'{}' on a collection requires a where clause", statement),
            position,
        )
        .with_fragment(subject.path.clone()));
    }
    Ok(())
}

fn transform_update(node: UpdateNode) -> SyntaxResult<UpdateQuery> {
    let subject = transform_subject(&node.subject);
    require_where(&subject, &node.predicates, "update", node.position)?;

    Ok(UpdateQuery {
        set: transform_setters(node.setters)?,
        where_clauses: transform_predicates(node.predicates)?,
        subject,
    })
}

fn transform_delete(node: DeleteNode) -> SyntaxResult<DeleteQuery> {
    let subject = transform_subject(&node.subject);
    require_where(&subject, &node.predicates, "delete", node.position)?;

    Ok(DeleteQuery {
        where_clauses: transform_predicates(node.predicates)?,
        subject,
    })
}

fn transform_insert(node: InsertNode) -> SyntaxResult<InsertQuery> {
    let identifier = match node.identifier.as_ref() {
        Some(value) => match evaluate(value)? {
            Literal::String(id) => Some(id),
            Literal::Integer(id) => Some(id.to_string()),
            _ => {
                return Err(SyntaxError::at(
                    "'identified by' expects a string or integer",
                    value.position(),
                ))
            }
        },
        None => None,
    };

    Ok(InsertQuery {
        collection: node.collection.name.trim_matches('/').to_string(),
        set: transform_setters(node.setters)?,
        identifier,
    })
}

fn transform_show(node: ShowNode) -> SyntaxResult<ShowQuery> {
    if node.predicates.is_some() {
        return Err(SyntaxError::at(
            "'show collections' cannot have a where clause",
            node.position,
        ));
    }

    Ok(ShowQuery {
        subject: node.subject.as_ref().map(transform_subject),
    })
}
