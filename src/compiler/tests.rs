#[cfg(test)]
mod tests {
    use crate::{
        compiler::{
            c::CodegenError, config::GeneratorConfig, memory::LayoutError,
            semantics::ModelError,
        },
        project::model::ScopeModel,
    };

    use super::super::*;

    fn run(text: &str) -> Result<Translation, TranslationError> {
        let model: ScopeModel = serde_yaml::from_str(text).unwrap();
        translate(&model, &GeneratorConfig::default())
    }

    #[test]
    fn test_translate() {
        let translation = run(
            "
variables:
  - {name: N, type: fixed}
  - name: SQUARE
    type:
      procedure:
        parameters: [X]
        returns: fixed
        scope:
          variables: [{name: X, type: fixed}]
          code:
            - kind:
                RETURN:
                  token: {operator: '*'}
                  children: [{token: {identifier: X}}, {token: {identifier: X}}]
  - {name: UNUSED, type: {procedure: {}}}
code:
  - kind:
      ASSIGN:
        lhs: [{token: {identifier: N}}]
        rhs: {token: {identifier: SQUARE}, children: [{token: {number: 3}}]}
",
        )
        .unwrap();

        assert_eq!(translation.removed, vec!["UNUSED"]);
        let names: Vec<&str> = translation.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["main.c", "SQUARE.c", "procedures.h", "memory.c", "configuration.h"]
        );

        let x = translation
            .tree
            .get(translation.tree.root())
            .table()
            .get("SQUARE")
            .and_then(|v| v.get_procedure())
            .map(|p| p.scope)
            .and_then(|s| translation.tree.get(s).table().get("X"))
            .and_then(|v| v.address)
            .unwrap();
        let square = &translation.files[1].contents;
        assert!(square.contains(&format!(
            "  return xmultiply(getFIXED({0}), getFIXED({0}));\n}}\n",
            x
        )));
        assert!(translation.files[0]
            .contents
            .contains(&format!("int32_t numberRHS = (int32_t) (( putFIXED({}, 3), SQUARE() ));", x)));
    }

    #[test]
    fn test_stage_errors() {
        match run("variables: [{name: A, type: fixed}, {name: A, type: fixed}]") {
            Err(TranslationError::Model(e)) => {
                assert_eq!(*e.get_inner(), ModelError::AlreadyDeclared("A".into()))
            }
            _ => panic!("Expected a model error"),
        }

        match run("variables: [{name: A, type: fixed, initial: [1, 2]}]") {
            Err(TranslationError::Layout(e)) => {
                assert_eq!(*e.get_inner(), LayoutError::TooManyInitializers("A".into()))
            }
            _ => panic!("Expected a layout error"),
        }

        match run("code: [{line: 9, text: 'X = 1;', kind: {ASSIGN: {lhs: [{token: {identifier: X}}], rhs: {token: {number: 1}}}}}]") {
            Err(TranslationError::Codegen(e)) => {
                assert_eq!(e.line(), 9);
                assert_eq!(*e.get_inner(), CodegenError::UnknownIdentifier("X".into()));
                assert_eq!(
                    TranslationError::Codegen(e).format(),
                    "L9: X = 1;\nUnknown variable X"
                );
            }
            _ => panic!("Expected a code generation error"),
        }
    }
}
