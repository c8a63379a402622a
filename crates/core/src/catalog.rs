//! Demo catalog shipped with the app: the two courses a new user sees in
//! progress, with the module states they start from.

use crate::error::Error;
use crate::model::{
    Course, CourseId, CourseLevel, Module, ModuleDuration, ModuleId, ModuleState,
};
use crate::progress::CourseProgress;

/// A catalog course together with its starting progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedCourse {
    pub course: Course,
    pub progress: CourseProgress,
}

struct SeedModule {
    id: u64,
    title: &'static str,
    minutes: u32,
    completed: bool,
    locked: bool,
    description: &'static str,
}

const fn seed(
    id: u64,
    title: &'static str,
    minutes: u32,
    completed: bool,
    locked: bool,
    description: &'static str,
) -> SeedModule {
    SeedModule {
        id,
        title,
        minutes,
        completed,
        locked,
        description,
    }
}

#[rustfmt::skip]
const AI_IN_CLASSROOM: [SeedModule; 12] = [
    seed(1, "Introdução à IA na Educação", 15, true, false, "Conceitos básicos de inteligência artificial aplicada à educação"),
    seed(2, "Ferramentas de IA para Professores", 20, true, false, "Principais plataformas e ferramentas disponíveis"),
    seed(3, "ChatGPT para Criação de Conteúdo", 25, true, false, "Como usar ChatGPT para criar planos de aula e materiais"),
    seed(4, "IA para Personalização do Ensino", 30, true, false, "Adaptando o ensino às necessidades individuais"),
    seed(5, "Avaliação Automatizada", 18, true, false, "Ferramentas de IA para correção e feedback"),
    seed(6, "Criação de Atividades Interativas", 22, true, false, "Desenvolvendo exercícios dinâmicos com IA"),
    seed(7, "Ética e IA na Educação", 28, true, false, "Considerações éticas no uso de IA"),
    seed(8, "Casos Práticos em Sala", 35, true, false, "Exemplos reais de aplicação"),
    seed(9, "Ferramentas de Apresentação com IA", 20, false, false, "Criando apresentações dinâmicas"),
    seed(10, "IA para Gestão de Turma", 25, false, false, "Organizando e gerenciando alunos com IA"),
    seed(11, "Projeto Final", 45, false, true, "Aplicação prática dos conhecimentos"),
    seed(12, "Certificação e Próximos Passos", 15, false, true, "Finalizando o curso e certificação"),
];

#[rustfmt::skip]
const BNCC_ACTIVITIES: [SeedModule; 8] = [
    seed(1, "Entendendo a BNCC", 20, true, false, "Fundamentos da Base Nacional Comum Curricular"),
    seed(2, "Competências e Habilidades", 25, true, false, "Mapeando competências por área"),
    seed(3, "Atividades para Educação Infantil", 30, true, false, "Criando atividades criativas para os pequenos"),
    seed(4, "Ensino Fundamental I", 35, false, false, "Atividades para os primeiros anos"),
    seed(5, "Ensino Fundamental II", 35, false, true, "Projetos para anos finais"),
    seed(6, "Avaliação na BNCC", 25, false, true, "Como avaliar competências"),
    seed(7, "Interdisciplinaridade", 30, false, true, "Conectando diferentes áreas do conhecimento"),
    seed(8, "Projeto Integrador", 40, false, true, "Desenvolvendo um projeto completo"),
];

/// Build the demo catalog.
///
/// # Errors
///
/// Returns `Error` if a seeded record fails validation.
pub fn demo_catalog() -> Result<Vec<SeedCourse>, Error> {
    Ok(vec![
        build(
            CourseId::new(1),
            "Usando IA na Sala de Aula",
            "Aprenda a integrar ferramentas de inteligência artificial no ensino",
            4.8,
            ("Tecnologia", CourseLevel::Intermediate),
            &AI_IN_CLASSROOM,
        )?,
        build(
            CourseId::new(2),
            "BNCC com Atividades Criativas",
            "Desenvolvimento de atividades alinhadas à Base Nacional Comum Curricular",
            4.9,
            ("Metodologia", CourseLevel::Basic),
            &BNCC_ACTIVITIES,
        )?,
    ])
}

fn build(
    id: CourseId,
    title: &str,
    description: &str,
    rating: f32,
    (category, level): (&str, CourseLevel),
    modules: &[SeedModule],
) -> Result<SeedCourse, Error> {
    let mut built = Vec::with_capacity(modules.len());
    let mut states = Vec::with_capacity(modules.len());
    for m in modules {
        let module_id = ModuleId::new(m.id);
        built.push(Module::new(
            module_id,
            m.title,
            ModuleDuration::from_minutes(m.minutes)?,
            m.description,
            None,
        )?);
        states.push((module_id, ModuleState::from_flags(m.completed, m.locked)));
    }

    let course = Course::new(id, title, description, rating, built)?
        .with_category(category)
        .with_level(level);
    let progress = CourseProgress::from_states(&course, states)?;
    Ok(SeedCourse { course, progress })
}
